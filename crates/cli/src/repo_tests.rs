// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::RepoConfig;
use std::collections::HashMap;
use tempfile::tempdir;

fn repo_config(path: PathBuf) -> RepoConfig {
    RepoConfig {
        path,
        github_owner: None,
        github_repo: None,
        base_branch: None,
        worktree_root: None,
        worktree_prefix: "issue-".into(),
        default_mode: None,
        cli_command: None,
        hooks: HashMap::new(),
    }
}

#[test]
fn explicit_repo_flag_wins_when_present_in_config() {
    let mut config = Config::default();
    config.repos.insert("web".to_string(), repo_config(PathBuf::from("/repos/web")));

    let resolved = resolve_repo(&config, Path::new("/tmp"), Some("web")).unwrap();
    assert_eq!(resolved, "web");
}

#[test]
fn explicit_repo_flag_errors_when_unknown() {
    let config = Config::default();
    let err = resolve_repo(&config, Path::new("/tmp"), Some("nope")).unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[test]
fn single_configured_repo_is_used_without_a_git_root_match() {
    let mut config = Config::default();
    config.repos.insert("only".to_string(), repo_config(PathBuf::from("/nowhere")));

    let resolved = resolve_repo(&config, Path::new("/tmp"), None).unwrap();
    assert_eq!(resolved, "only");
}

#[test]
fn git_root_match_picks_the_right_repo_among_several() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();

    let mut config = Config::default();
    config.repos.insert("other".to_string(), repo_config(PathBuf::from("/elsewhere")));
    config.repos.insert("this".to_string(), repo_config(dir.path().to_path_buf()));

    let nested = dir.path().join("crates/cli");
    std::fs::create_dir_all(&nested).unwrap();

    let resolved = resolve_repo(&config, &nested, None).unwrap();
    assert_eq!(resolved, "this");
}

#[test]
fn no_match_among_several_configured_repos_errors() {
    let mut config = Config::default();
    config.repos.insert("a".to_string(), repo_config(PathBuf::from("/a")));
    config.repos.insert("b".to_string(), repo_config(PathBuf::from("/b")));

    let err = resolve_repo(&config, Path::new("/tmp/unrelated"), None).unwrap_err();
    assert!(err.to_string().contains("--repo"));
}

#[test]
fn no_configured_repos_errors() {
    let config = Config::default();
    let err = resolve_repo(&config, Path::new("/tmp"), None).unwrap_err();
    assert!(err.to_string().contains("no repos configured"));
}
