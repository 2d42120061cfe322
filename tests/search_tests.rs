mod test_harness;

use grep_worker::config::GrepConfig;
use grep_worker::search::{GrepSearcher, SearchError, SearchOptions, Searcher};
use tempfile::TempDir;
use test_harness::write_fixture;

fn searcher() -> GrepSearcher {
    GrepSearcher::new(GrepConfig::default())
}

#[tokio::test]
async fn finds_every_occurrence() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(
        dir.path(),
        "log.txt",
        "error: one\nok\nerror: two\nok\nerror: three\n",
    );

    let matches = searcher()
        .search("error", &file, SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].line_number, 1);
    assert_eq!(matches[1].line_number, 3);
    assert_eq!(matches[2].line_number, 5);
    assert_eq!(matches[0].line, "error: one");
}

#[tokio::test]
async fn no_occurrences_is_empty_not_error() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path(), "log.txt", "nothing to see\n");

    let matches = searcher()
        .search("absent", &file, SearchOptions::default())
        .await
        .unwrap();

    assert!(matches.is_empty());
}

#[tokio::test]
async fn case_insensitive_flag() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path(), "log.txt", "Error here\nerror there\n");

    let sensitive = searcher()
        .search("error", &file, SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(sensitive.len(), 1);

    let insensitive = searcher()
        .search(
            "error",
            &file,
            SearchOptions {
                case_insensitive: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(insensitive.len(), 2);
}

#[tokio::test]
async fn context_lines_attach_to_match() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path(), "log.txt", "a\nb\nhit\nc\nd\n");

    let matches = searcher()
        .search(
            "hit",
            &file,
            SearchOptions {
                context_lines: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].line_number, 3);
    assert_eq!(matches[0].context.len(), 2);
    assert_eq!(matches[0].context[0].line, "b");
    assert_eq!(matches[0].context[1].line, "c");
}

#[tokio::test]
async fn extended_regexp_alternation() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path(), "log.txt", "alpha\nbeta\ngamma\n");

    let matches = searcher()
        .search("alpha|gamma", &file, SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
}

#[tokio::test]
async fn compile_check_accepts_valid_pattern() {
    assert!(searcher().compile_check("[a-f][0-9]+").await.is_ok());
}

#[tokio::test]
async fn compile_check_rejects_bad_pattern() {
    let err = searcher().compile_check("(unclosed").await.unwrap_err();
    assert!(matches!(err, SearchError::PatternInvalid(_)));
}

#[tokio::test]
async fn dash_prefixed_pattern_is_not_a_flag() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path(), "log.txt", "-v marks verbose\n");

    let matches = searcher()
        .search("-v", &file, SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn match_cap_limits_results() {
    let dir = TempDir::new().unwrap();
    let file = write_fixture(dir.path(), "log.txt", "x\nx\nx\nx\n");

    let capped = GrepSearcher::new(GrepConfig {
        max_matches: 2,
        ..Default::default()
    });
    let matches = capped
        .search("x", &file, SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
}
