use portal_core::{project_records, Biblio, StoredFile, UserContentStats, DEFAULT_TITLE};
use pretty_assertions::assert_eq;
use serde_json::json;

const TEMPLATE: &str = "http://catalog.test/detail?biblionumber={id}";

fn biblios() -> Vec<Biblio> {
    serde_json::from_value(json!([
        { "biblio_id": 1, "title": "Civil Code of Ethiopia", "author": "Imperial Government",
          "copyright_date": 1960, "isbn": "" },
        { "biblio_id": "2", "title": null, "author": "Anon", "publication_year": "1999" },
        { "biblio_id": 3, "title": "Registry Handbook", "author": null, "publisher": "Ministry" },
        { "biblio_id": null, "title": "Broken row" }
    ]))
    .unwrap()
}

#[test]
fn empty_query_projects_every_record_with_an_id() {
    let records = project_records(biblios(), "", TEMPLATE);
    assert_eq!(records.len(), 3);

    let first = &records[0];
    assert_eq!(first.id, "1");
    assert_eq!(first.year.as_deref(), Some("1960"));
    assert_eq!(first.isbn, None);
    assert_eq!(first.url, "http://catalog.test/detail?biblionumber=1");

    assert_eq!(records[1].title, DEFAULT_TITLE);
    assert_eq!(records[1].year.as_deref(), Some("1999"));
    assert_eq!(records[2].publisher.as_deref(), Some("Ministry"));
}

#[test]
fn query_matches_title_or_author_case_insensitively() {
    let ids: Vec<String> = project_records(biblios(), "  CIVIL ", TEMPLATE)
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["1".to_string()]);

    let ids: Vec<String> = project_records(biblios(), "anon", TEMPLATE)
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["2".to_string()]);

    assert!(project_records(biblios(), "no such thing", TEMPLATE).is_empty());
}

#[test]
fn stored_files_accept_numeric_ids() {
    let files: Vec<StoredFile> = serde_json::from_value(json!([
        { "id": 12, "title": "Marriage record", "description": "",
          "file_url": "/media/uploads/m.pdf", "dspace_id": "", "created_at": "2025-01-02T10:00:00Z" }
    ]))
    .unwrap();
    assert_eq!(files[0].id, "12");
    assert_eq!(files[0].file_url.as_deref(), Some("/media/uploads/m.pdf"));
    assert!(files[0].repository_id.is_empty());
}

#[test]
fn user_content_stats_helpers() {
    let stats: UserContentStats = serde_json::from_value(json!({
        "mySubmission": {
            "workspace": { "total": 0, "rejected": 0 },
            "workflow": { "total": 2, "finaleditstep": 0 },
            "archived": 5,
            "withdrawn": 0
        },
        "myActions": {
            "reviewstep": { "Approved": 3, "Rejected": 1 },
            "editstep": { "Approved": 2 }
        }
    }))
    .unwrap();

    assert!(stats.has_submissions());
    assert_eq!(stats.action_count("reviewstep", "approved"), 3);
    assert_eq!(stats.action_count("reviewstep", "claimed"), 0);
    assert_eq!(stats.action_count("missing", "approved"), 0);

    let entries = stats.action_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].step, "editstep");
    assert_eq!(UserContentStats::step_label(&entries[1].step), "Review Step");
    assert_eq!(UserContentStats::step_label("custom"), "custom");

    assert!(!UserContentStats::default().has_submissions());
}
