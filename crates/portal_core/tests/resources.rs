use portal_core::{
    attachment_file_name, count_by_source, project_resources, Registration, ResourceFilters,
    ResourceSearchPage, ResourceSource, SourceLinks, ValidationError,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn links() -> SourceLinks {
    SourceLinks {
        local: "http://portal/api/resources/{id}/preview/".to_string(),
        catalog: "http://opac/detail?biblionumber={id}".to_string(),
        repository: "http://repo/handle/{id}".to_string(),
        discovery: "http://discovery/Record/{id}".to_string(),
    }
}

#[test]
fn attachment_names_are_taken_from_the_disposition() {
    assert_eq!(
        attachment_file_name("attachment; filename=\"acta 1921.pdf\"").as_deref(),
        Some("acta 1921.pdf")
    );
    assert_eq!(
        attachment_file_name("attachment; FILENAME=media/uploads/scan.tif").as_deref(),
        Some("scan.tif")
    );
    assert_eq!(attachment_file_name("inline"), None);
    assert_eq!(attachment_file_name("attachment; filename=\"\""), None);
}

#[test]
fn filters_keep_query_and_limit_and_drop_blanks() {
    let filters = ResourceFilters {
        source: Some("koha".to_string()),
        resource_type: None,
        year: Some(" ".to_string()),
    };

    assert_eq!(
        filters.query_params(" actas ", 20),
        vec![
            ("q", "actas".to_string()),
            ("source", "koha".to_string()),
            ("limit", "20".to_string()),
        ]
    );
}

#[test]
fn record_without_a_remote_id_falls_back_to_its_url() {
    let page: ResourceSearchPage = serde_json::from_value(json!({
        "results": [
            { "title": "Sin id", "source": "dspace", "url": "http://repo/items/uuid-1" },
            { "title": "", "source": "koha" }
        ]
    }))
    .unwrap();

    let records = project_resources(page, &links());

    assert_eq!(records[0].link.as_deref(), Some("http://repo/items/uuid-1"));
    assert_eq!(records[1].title, "Untitled");
    assert_eq!(records[1].link, None);
}

#[test]
fn records_are_counted_per_source() {
    let page: ResourceSearchPage = serde_json::from_value(json!({
        "results": [
            { "title": "a", "source": "koha", "external_id": 1 },
            { "title": "b", "source": "local", "id": 2 },
            { "title": "c", "source": "koha", "external_id": 3 }
        ]
    }))
    .unwrap();

    let counts = count_by_source(&project_resources(page, &links()));

    assert_eq!(
        counts.into_iter().collect::<Vec<_>>(),
        vec![(ResourceSource::Local, 1), (ResourceSource::Koha, 2)]
    );
}

#[test]
fn registration_is_checked_before_sending() {
    let valid = Registration {
        username: "ana".to_string(),
        email: "ana@registry.test".to_string(),
        password: "pw".to_string(),
        confirm_password: "pw".to_string(),
        ..Registration::default()
    };
    assert_eq!(valid.validate(), Ok(()));

    let cases = [
        (
            Registration {
                username: " ".to_string(),
                ..valid.clone()
            },
            ValidationError::MissingField("username"),
        ),
        (
            Registration {
                email: "ana".to_string(),
                ..valid.clone()
            },
            ValidationError::InvalidEmail,
        ),
        (
            Registration {
                confirm_password: "other".to_string(),
                ..valid.clone()
            },
            ValidationError::PasswordMismatch,
        ),
    ];
    for (registration, expected) in cases {
        assert_eq!(registration.validate(), Err(expected));
    }
}
