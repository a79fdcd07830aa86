//! Tests for git module

use super::*;
use git2::RepositoryInitOptions;
use temp_dir::TempDir;

fn init_repo(dir: &Path, branch: &str) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head(&format!("refs/heads/{branch}"));
    Repository::init_opts(dir, &opts).unwrap()
}

fn source_repo_with_history(dir: &Path) -> Repository {
    let repo = init_repo(dir, "main");
    fs::write(dir.join("README.md"), "# Widgets").unwrap();
    let first = commit_path(&repo, "*", "Initial commit").unwrap().unwrap();
    {
        let commit = repo.find_commit(first).unwrap();
        repo.branch("develop", &commit, false).unwrap();
        repo.tag_lightweight("v1.0", commit.as_object(), false)
            .unwrap();
    }
    repo
}

fn file_url(path: &Path) -> Url {
    Url::from_file_path(path).unwrap()
}

#[test]
fn test_repository_url() {
    let base = Url::parse("https://github.com").unwrap();
    let url = repository_url(&base, "acme", "widgets").unwrap();
    assert_eq!(url.as_str(), "https://github.com/acme/widgets.git");
}

#[test]
fn test_commit_path_skips_unchanged_tree() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path(), "main");
    fs::write(dir.path().join("a.txt"), "a").unwrap();

    let first = commit_path(&repo, "*", "Add a").unwrap();
    assert!(first.is_some());
    assert_eq!(head_branch(&repo).unwrap(), "main");

    let second = commit_path(&repo, "*", "Nothing").unwrap();
    assert!(second.is_none());

    fs::write(dir.path().join("b.txt"), "b").unwrap();
    let third = commit_path(&repo, "*", "Add b").unwrap().unwrap();
    let commit = repo.find_commit(third).unwrap();
    assert_eq!(commit.parent_count(), 1);
    assert_eq!(commit.message().unwrap(), "Add b");
}

#[test]
fn test_mirror_clone_copies_every_ref() {
    let source_dir = TempDir::new().unwrap();
    source_repo_with_history(source_dir.path());
    let mirror_dir = TempDir::new().unwrap();
    let dest = mirror_dir.path().join("widgets");

    let mirror = mirror_clone(&file_url(source_dir.path()), &dest, None).unwrap();

    assert!(mirror.is_bare());
    assert!(mirror.find_reference("refs/heads/main").is_ok());
    assert!(mirror.find_reference("refs/heads/develop").is_ok());
    assert!(mirror.find_reference("refs/tags/v1.0").is_ok());
    assert!(mirror
        .config()
        .unwrap()
        .get_bool("remote.origin.mirror")
        .unwrap());
}

#[test]
fn test_clone_then_push_new_commit() {
    let source_dir = TempDir::new().unwrap();
    source_repo_with_history(source_dir.path());
    let target_dir = TempDir::new().unwrap();
    let target = Repository::init_bare(target_dir.path()).unwrap();

    let work_dir = TempDir::new().unwrap();
    let work_path = work_dir.path().join("checkout");
    let work = clone_repository(&file_url(source_dir.path()), &work_path, None).unwrap();
    assert_eq!(head_branch(&work).unwrap(), "main");

    fs::create_dir_all(work_path.join("docs")).unwrap();
    fs::write(work_path.join("docs/guide.md"), "guide").unwrap();
    let oid = commit_path(&work, "docs", "Add docs").unwrap().unwrap();

    push(
        &work,
        &file_url(target_dir.path()),
        &["refs/heads/main:refs/heads/main".to_string()],
        None,
    )
    .unwrap();

    let pushed = target.find_reference("refs/heads/main").unwrap();
    assert_eq!(pushed.target(), Some(oid));
}

#[test]
fn test_set_branch_moves_existing_ref() {
    let dir = TempDir::new().unwrap();
    let repo = source_repo_with_history(dir.path());
    fs::write(dir.path().join("more.txt"), "more").unwrap();
    let newer = commit_path(&repo, "*", "More").unwrap().unwrap();

    set_branch(&repo, "develop", newer).unwrap();

    let develop = repo.find_reference("refs/heads/develop").unwrap();
    assert_eq!(develop.target(), Some(newer));
}

#[test]
fn test_copy_tree_skips_git_directory() {
    let src = TempDir::new().unwrap();
    init_repo(src.path(), "main");
    fs::create_dir_all(src.path().join("scripts/nested")).unwrap();
    fs::write(src.path().join("scripts/run.ps1"), "Write-Host hi").unwrap();
    fs::write(src.path().join("scripts/nested/lib.ps1"), "# lib").unwrap();
    let dest = TempDir::new().unwrap();
    let target = dest.path().join("TeamCity/powershell/scripts");

    let copied = copy_tree(&src.path().join("scripts"), &target).unwrap();

    assert_eq!(copied, 2);
    assert!(target.join("nested/lib.ps1").exists());

    let whole = TempDir::new().unwrap();
    copy_tree(src.path(), whole.path()).unwrap();
    assert!(!whole.path().join(".git").exists());
}

#[test]
fn test_copy_tree_rejects_missing_source() {
    let dest = TempDir::new().unwrap();
    let result = copy_tree(&dest.path().join("absent"), dest.path());
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
