//! Editing `debian/rules` in a temporary package

use std::fs;

use deb_edit::handlers::{RulesUpdate, check_cdbs, dh_invoke_drop_with, update_rules};
use deb_edit::{EditorOptions, Error};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const RULES: &str = "\
#!/usr/bin/make -f

%:
\tdh $@ --with python3

override_dh_auto_install:
\tdh_auto_install --destdir=debian/tmp
";

fn package(rules: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("debian")).unwrap();
    fs::write(dir.path().join("debian/rules"), rules).unwrap();
    dir
}

#[test]
fn test_update_rewrites_dh_invocation() {
    let dir = package(RULES);
    let path = dir.path().join("debian/rules");
    let update = RulesUpdate::new().command_line(|line, _| vec![dh_invoke_drop_with(line, "python3")]);

    assert!(update_rules(&path, EditorOptions::new(), update).unwrap());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        RULES.replace(" --with python3", "")
    );
}

#[test]
fn test_update_discards_override_made_pointless() {
    let dir = package(RULES);
    let path = dir.path().join("debian/rules");
    let update = RulesUpdate::new().command_line(|line, target| match target {
        "override_dh_auto_install" => vec![line.replace(" --destdir=debian/tmp", "")],
        _ => vec![line.to_string()],
    });

    assert!(update_rules(&path, EditorOptions::new(), update).unwrap());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "#!/usr/bin/make -f\n\n%:\n\tdh $@ --with python3\n"
    );
}

#[test]
fn test_update_without_changes_leaves_file() {
    let dir = package(RULES);
    let path = dir.path().join("debian/rules");
    let update = RulesUpdate::new().command_line(|line, _| vec![line.to_string()]);
    assert!(!update_rules(&path, EditorOptions::new(), update).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), RULES);
}

#[test]
fn test_update_missing_rules_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let update = RulesUpdate::new().global_line(|_| None);
    assert!(!update_rules(dir.path().join("debian/rules"), EditorOptions::new(), update).unwrap());
}

#[test]
fn test_update_refuses_marked_rules() {
    let marked = RULES.replacen('\n', "\n# DO NOT EDIT: generated by autogen.sh\n", 1);
    let dir = package(&marked);
    let path = dir.path().join("debian/rules");
    let update = RulesUpdate::new().command_line(|line, _| vec![dh_invoke_drop_with(line, "python3")]);

    let err = update_rules(&path, EditorOptions::new(), update).unwrap_err();
    assert!(matches!(err, Error::GeneratedFile { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), marked);
}

#[cfg(unix)]
#[test]
fn test_update_keeps_rules_executable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = package(RULES);
    let path = dir.path().join("debian/rules");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    let update = RulesUpdate::new().command_line(|line, _| vec![dh_invoke_drop_with(line, "python3")]);

    update_rules(&path, EditorOptions::new(), update).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn test_check_cdbs() {
    let dir = package("#!/usr/bin/make -f\n-include /usr/share/cdbs/1/rules/debhelper.mk\n");
    assert!(check_cdbs(dir.path().join("debian/rules")).unwrap());

    let dir = package(RULES);
    assert!(!check_cdbs(dir.path().join("debian/rules")).unwrap());
    assert!(!check_cdbs(dir.path().join("debian/missing")).unwrap());
}
