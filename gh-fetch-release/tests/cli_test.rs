use clap::Parser;
use gh_fetch_release::cli::Args;
use gh_fetch_release::config::RunConfig;
use std::path::PathBuf;

const REQUIRED: [&str; 9] = [
    "gh-fetch-release",
    "--repo",
    "BurntSushi/ripgrep",
    "--pattern",
    r"x86_64-unknown-linux-musl\.tar\.gz$",
    "--outdir",
    "/opt/bin",
    "--binfiles",
    "ripgrep-*/rg",
];

fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
    let mut argv = REQUIRED.to_vec();
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv)
}

#[test]
fn test_required_flags() {
    let args = parse(&[]).unwrap();

    assert_eq!(args.repo.owner, "BurntSushi");
    assert_eq!(args.repo.name, "ripgrep");
    assert_eq!(args.pattern.as_str(), r"x86_64-unknown-linux-musl\.tar\.gz$");
    assert_eq!(args.outdir(), PathBuf::from("/opt/bin"));
    assert_eq!(args.binfiles.as_str(), "ripgrep-*/rg");
    assert!(args.download_dir().is_none());
    assert!(!args.setexec);
    assert!(args.rename.is_none());
}

#[test]
fn test_each_required_flag_is_required() {
    for flag in ["--repo", "--pattern", "--outdir", "--binfiles"] {
        let position = REQUIRED.iter().position(|a| *a == flag).unwrap();
        let argv: Vec<&str> = REQUIRED
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position && *i != position + 1)
            .map(|(_, a)| *a)
            .collect();

        let err = Args::try_parse_from(argv).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument,
            "{flag}"
        );
    }
}

#[test]
fn test_optional_flags() {
    let args = parse(&[
        "--downloaddir",
        "/var/cache/gh",
        "--setexec",
        "--rename",
        "rg2",
    ])
    .unwrap();

    assert_eq!(args.download_dir(), Some(PathBuf::from("/var/cache/gh")));
    assert!(args.setexec);
    assert_eq!(args.rename.as_deref(), Some("rg2"));
}

#[test]
fn test_invalid_repo_is_rejected() {
    for repo in ["ripgrep", "/ripgrep", "BurntSushi/", "a/b/c"] {
        let argv = [
            "gh-fetch-release",
            "--repo",
            repo,
            "--pattern",
            "linux",
            "--outdir",
            "/opt/bin",
            "--binfiles",
            "rg",
        ];
        let err = Args::try_parse_from(argv).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{repo}");
    }
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let argv = [
        "gh-fetch-release",
        "--repo",
        "owner/tool",
        "--pattern",
        "linux(",
        "--outdir",
        "/opt/bin",
        "--binfiles",
        "tool",
    ];
    let err = Args::try_parse_from(argv).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[test]
fn test_invalid_binfiles_glob_is_rejected() {
    let argv = [
        "gh-fetch-release",
        "--repo",
        "owner/tool",
        "--pattern",
        "linux",
        "--outdir",
        "/opt/bin",
        "--binfiles",
        "tool-[1.0/tool",
    ];
    let err = Args::try_parse_from(argv).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[test]
fn test_unambiguous_prefixes_are_accepted() {
    let args = Args::try_parse_from([
        "gh-fetch-release",
        "--repo",
        "owner/tool",
        "--pat",
        "linux",
        "--out",
        "/opt/bin",
        "--bin",
        "tool-*/tool",
        "--set",
    ])
    .unwrap();

    assert_eq!(args.pattern.as_str(), "linux");
    assert_eq!(args.binfiles.as_str(), "tool-*/tool");
    assert!(args.setexec);
}

#[test]
fn test_ambiguous_prefix_is_rejected() {
    // --re could be --repo or --rename
    assert!(Args::try_parse_from([
        "gh-fetch-release",
        "--re",
        "owner/tool",
        "--pattern",
        "linux",
        "--outdir",
        "/opt/bin",
        "--binfiles",
        "tool",
    ])
    .is_err());
}

#[test]
fn test_home_is_expanded() {
    let args = parse(&["--downloaddir", "~/downloads"]).unwrap();
    let download_dir = args.download_dir().unwrap();

    assert!(!download_dir.to_string_lossy().starts_with('~'));
    assert!(download_dir.ends_with("downloads"));
}

#[test]
fn test_token_flag_reaches_client_config() {
    let config = RunConfig::from_args(parse(&["--token", "ghp_example"]).unwrap());

    assert_eq!(config.client.token.as_deref(), Some("ghp_example"));
    assert_eq!(config.request.binfiles.as_str(), "ripgrep-*/rg");
}
