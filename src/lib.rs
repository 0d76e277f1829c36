//! # sdc-mender
//!
//! Batch repair of single-directory component definitions
//! (`*.component.yml`) and the Twig templates that use them.
//!
//! The engine works on syntactic regions located by indentation rather than
//! on a full YAML or Twig parse. It finds a small set of known-bad shapes,
//! rewrites exactly the span each one occupies, and leaves every other byte
//! alone. Running it twice changes nothing the second time.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐   ┌────────────┐   ┌────────────┐
//! *.component.yml │   region +   │──▶│  classify  │──▶│  rewrite   │──┐
//!     ───────────▶│    names     │   │ (findings) │   │ (1 / pass) │  │
//!                 └──────────────┘   └────────────┘   └────────────┘  │  ┌──────────┐
//!                                                                     ├─▶│  commit  │
//!                 ┌──────────────────────────────────────────────┐    │  │ .bak+mv  │
//!     *.twig ────▶│ heading: legacy include → canonical include  │────┘  └──────────┘
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sdcm check --root web/themes/custom/site/components
//! sdcm fix --root web/themes/custom/site/components --dry-run
//! sdcm fix --config sdcm.toml
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`region`] | Indentation-bounded region extraction |
//! | [`names`] | Declared names at a fixed depth |
//! | [`classify`] | Anomaly classification |
//! | [`rewrite`] | Span-exact rewrites and the fix loop |
//! | [`heading`] | Legacy heading include rewriting |
//! | [`models`] | Core data types |
//! | [`document`] | File decoding |
//! | [`discover`] | Candidate file discovery |
//! | [`commit`] | Backup-then-replace writes |
//! | [`run`] | Run orchestration and summary |
//! | [`progress`] | Per-file progress on stderr |
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error types |

pub mod classify;
pub mod commit;
pub mod config;
pub mod discover;
pub mod document;
pub mod error;
pub mod heading;
pub mod models;
pub mod names;
pub mod progress;
pub mod region;
pub mod rewrite;
pub mod run;
