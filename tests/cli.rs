use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn sdcm_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("sdcm");
    path
}

const CARD: &str = "name: Card\nprops:\n  type: object\n  properties:\n    title:\n      type: string\n    icon:\n      type: string\nslots:\n  title: {}\nvariants: []\n";
const TEASER: &str = "name: Teaser\nprops:\n  type: object\n  properties:\nslots:\n  body: {}\n";
const CLEAN: &str = "name: Clean\nprops:\n  type: object\n  properties:\n    size:\n      type: string\n";
const BANNER: &str = "variants:\n  default: []\n";
const TEMPLATE: &str = "<div>\n  {{ include('@components/h2.html.twig', {content: title}) }}\n</div>\n";

fn setup_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    for (dir, file, body) in [
        ("card", "card.component.yml", CARD),
        ("teaser", "teaser.component.yml", TEASER),
        ("clean", "clean.component.yml", CLEAN),
        ("banner", "banner.component.yml", BANNER),
        ("card", "card.twig", TEMPLATE),
    ] {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join(file), body).unwrap();
    }
    // Excluded by default.
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("node_modules/pkg/x.component.yml"), "variants: []\n").unwrap();

    tmp
}

fn run_sdcm(args: &[&str]) -> (String, String, bool) {
    let binary = sdcm_binary();
    let output = Command::new(&binary)
        .args(args)
        .arg("--progress")
        .arg("off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run sdcm binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn root_arg(tmp: &TempDir) -> String {
    tmp.path().to_str().unwrap().to_string()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_check_reports_without_writing() {
    let tmp = setup_tree();
    let root = root_arg(&tmp);

    let (stdout, stderr, success) = run_sdcm(&["check", "--root", &root]);
    assert!(success, "check failed: {}", stderr);
    assert!(stdout.starts_with("check (dry-run)"));
    assert!(stdout.contains("files scanned: 5"), "stdout: {}", stdout);
    assert!(stdout.contains("files changed: 3"));
    assert!(stdout.contains("fixes: 4"));
    assert!(stdout.contains("manual actions: 1"));
    assert!(stdout.contains("would fix"));
    assert!(stdout.ends_with("ok\n"));

    assert_eq!(read(&tmp.path().join("card/card.component.yml")), CARD);
    assert!(!tmp.path().join("card/card.component.yml.bak").exists());
}

#[test]
fn test_fix_writes_and_backs_up() {
    let tmp = setup_tree();
    let root = root_arg(&tmp);

    let (stdout, stderr, success) = run_sdcm(&["fix", "--root", &root]);
    assert!(success, "fix failed: {}", stderr);
    assert!(stdout.starts_with("fix\n"));
    assert!(stdout.contains("fixes: 4"));

    let card = tmp.path().join("card/card.component.yml");
    assert_eq!(
        read(&card),
        "name: Card\nprops:\n  type: object\n  properties:\n    icon:\n      type: string\nslots:\n  title: {}\nvariants: {}\n"
    );
    assert_eq!(read(&tmp.path().join("card/card.component.yml.bak")), CARD);

    let teaser = tmp.path().join("teaser/teaser.component.yml");
    assert!(read(&teaser).contains("  properties: {}\n"));

    let template = read(&tmp.path().join("card/card.twig"));
    assert!(template.contains("@adesso_cms_theme/heading/heading.twig"));
    assert!(!template.contains("@components/h2.html.twig"));
    assert_eq!(read(&tmp.path().join("card/card.twig.bak")), TEMPLATE);

    // Untouched files get no backup.
    assert!(!tmp.path().join("clean/clean.component.yml.bak").exists());
    assert!(!tmp.path().join("banner/banner.component.yml.bak").exists());
    assert_eq!(read(&tmp.path().join("node_modules/pkg/x.component.yml")), "variants: []\n");
}

#[test]
fn test_second_fix_changes_nothing() {
    let tmp = setup_tree();
    let root = root_arg(&tmp);

    let (_, stderr, success) = run_sdcm(&["fix", "--root", &root]);
    assert!(success, "first fix failed: {}", stderr);
    let card = read(&tmp.path().join("card/card.component.yml"));

    let (stdout, _, success) = run_sdcm(&["fix", "--root", &root]);
    assert!(success);
    assert!(stdout.contains("files changed: 0"), "stdout: {}", stdout);
    assert!(stdout.contains("fixes: 0"));
    assert!(stdout.contains("manual actions: 1"));
    assert_eq!(read(&tmp.path().join("card/card.component.yml")), card);
}

#[test]
fn test_fix_dry_run_writes_nothing() {
    let tmp = setup_tree();
    let root = root_arg(&tmp);

    let (stdout, _, success) = run_sdcm(&["fix", "--dry-run", "--root", &root]);
    assert!(success);
    assert!(stdout.starts_with("fix (dry-run)"));
    assert_eq!(read(&tmp.path().join("teaser/teaser.component.yml")), TEASER);
    assert!(!tmp.path().join("teaser/teaser.component.yml.bak").exists());
}

#[test]
fn test_pass_selects_file_kinds() {
    let tmp = setup_tree();
    let root = root_arg(&tmp);

    let (stdout, _, success) = run_sdcm(&["fix", "--pass", "templates", "--root", &root]);
    assert!(success);
    assert!(stdout.contains("files scanned: 1"), "stdout: {}", stdout);
    assert_eq!(read(&tmp.path().join("card/card.component.yml")), CARD);
    assert!(tmp.path().join("card/card.twig.bak").exists());
}

#[test]
fn test_config_file_sets_root_and_suffix() {
    let tmp = setup_tree();
    let config_path = tmp.path().join("sdcm.toml");
    fs::write(
        &config_path,
        format!(
            "[scan]\nroot = \"{}\"\ntemplate_globs = []\n\n[backup]\nsuffix = \".orig\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_sdcm(&["--config", config_path.to_str().unwrap(), "fix"]);
    assert!(success, "fix failed: {}", stderr);
    assert!(stdout.contains("files scanned: 4"), "stdout: {}", stdout);
    assert!(tmp.path().join("card/card.component.yml.orig").exists());
    assert!(!tmp.path().join("card/card.component.yml.bak").exists());
}

#[test]
fn test_missing_root_is_fatal() {
    let (_, stderr, success) = run_sdcm(&["check"]);
    assert!(!success);
    assert!(stderr.contains("No scan root"), "stderr: {}", stderr);

    let tmp = TempDir::new().unwrap();
    let gone = tmp.path().join("gone");
    let (_, stderr, success) = run_sdcm(&["check", "--root", gone.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("sdcm.toml");
    fs::write(&config_path, "[schema]\nindent_width = 0\n").unwrap();

    let (_, stderr, success) = run_sdcm(&[
        "--config",
        config_path.to_str().unwrap(),
        "check",
        "--root",
        tmp.path().to_str().unwrap(),
    ]);
    assert!(!success);
    assert!(stderr.contains("indent_width"));
}
