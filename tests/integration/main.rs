//! Integration tests for rubypack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Binary with the user's config and build overrides isolated
    fn rubypack(config_dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("rubypack");
        cmd.env("RUBYPACK_CONFIG", config_dir.join("config.toml"))
            .env_remove("RUBY_VERSION")
            .env_remove("BUNDLE_WITHOUT");
        cmd
    }

    #[test]
    fn help_displays() {
        let config = TempDir::new().unwrap();
        rubypack(config.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Ruby buildpack compiler"));
    }

    #[test]
    fn version_displays() {
        let config = TempDir::new().unwrap();
        rubypack(config.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("rubypack"));
    }

    #[test]
    fn config_path() {
        let config = TempDir::new().unwrap();
        rubypack(config.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let config = TempDir::new().unwrap();
        rubypack(config.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[runtime]"))
            .stdout(predicate::str::contains("assets:precompile"));
    }

    #[test]
    fn config_init_writes_file() {
        let config = TempDir::new().unwrap();
        rubypack(config.path())
            .args(["config", "init"])
            .assert()
            .success();

        let written = fs::read_to_string(config.path().join("config.toml")).unwrap();
        assert!(written.contains("[bundler]"));
    }

    #[test]
    fn invalid_config_fails() {
        let config = TempDir::new().unwrap();
        fs::write(config.path().join("config.toml"), "[runtime\n").unwrap();

        rubypack(config.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn compile_requires_dirs() {
        let config = TempDir::new().unwrap();
        rubypack(config.path()).arg("compile").assert().failure();
    }

    #[test]
    fn compile_missing_build_dir_fails() {
        let config = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        rubypack(config.path())
            .args(["compile", "/nonexistent/rubypack/build"])
            .arg(cache.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn compile_without_prebuilt_runtime_fails() {
        let config = TempDir::new().unwrap();
        let build = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let runtimes = TempDir::new().unwrap();
        fs::write(
            build.path().join("Gemfile.lock"),
            "GEM\n  specs:\n\nRUBY VERSION\n   ruby 9.9.9p1\n",
        )
        .unwrap();

        rubypack(config.path())
            .arg("compile")
            .arg(build.path())
            .arg(cache.path())
            .arg("--runtime-root")
            .arg(runtimes.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("No prebuilt Ruby ruby-9.9.9"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[cfg(unix)]
    #[test]
    fn compile_without_lockfile_fails_after_provisioning() {
        use std::os::unix::fs::PermissionsExt;

        let config = TempDir::new().unwrap();
        let build = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let runtimes = TempDir::new().unwrap();

        let bin = runtimes.path().join("3.2.0/bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("ruby"), "#!/bin/sh\necho 'ruby 3.2.0'\n").unwrap();
        fs::set_permissions(bin.join("ruby"), fs::Permissions::from_mode(0o755)).unwrap();

        rubypack(config.path())
            .env("RUBY_VERSION", "3.2.0")
            .arg("compile")
            .arg(build.path())
            .arg(cache.path())
            .arg("--runtime-root")
            .arg(runtimes.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("Using Ruby version: 3.2.0"))
            .stderr(predicate::str::contains("Gemfile.lock is required"));

        assert!(build.path().join("vendor/3.2.0/bin/ruby").is_file());
        assert!(build.path().join("bin/ruby").exists());
        assert!(build.path().join(".profile.d/ruby.sh").is_file());
    }
}
