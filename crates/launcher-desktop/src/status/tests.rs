use super::*;

#[test]
fn status_request_accepts_canonical_names_and_aliases() {
    let req: StatusRequest = serde_json::from_str(r#"{"status": "degraded"}"#).unwrap();
    assert_eq!(req.status, StatusLevel::Degraded);

    let req: StatusRequest = serde_json::from_str(r#"{"status": "fail"}"#).unwrap();
    assert_eq!(req.status, StatusLevel::Blocking);

    assert_eq!(
        serde_json::to_string(&StatusRequest {
            status: StatusLevel::Idle
        })
        .unwrap(),
        r#"{"status":"idle"}"#
    );
}

#[test]
fn status_request_rejects_unknown_fields_and_levels() {
    assert!(serde_json::from_str::<StatusRequest>(r#"{"status": "healthy", "extra": 1}"#).is_err());
    assert!(serde_json::from_str::<StatusRequest>(r#"{"status": "purple"}"#).is_err());
    assert!(serde_json::from_str::<StatusRequest>(r#"{}"#).is_err());
}

#[test]
fn from_str_round_trips_display() {
    for level in [
        StatusLevel::Healthy,
        StatusLevel::Degraded,
        StatusLevel::Blocking,
        StatusLevel::Idle,
    ] {
        assert_eq!(level.to_string().parse::<StatusLevel>(), Ok(level));
    }
    assert_eq!(" WARN ".parse::<StatusLevel>(), Ok(StatusLevel::Degraded));
    assert!("".parse::<StatusLevel>().is_err());
}
