use llm_adapter::{Error, LogicalModel, Request, Response, ServiceType};
use serde_json::json;

#[test]
fn test_service_from_field() {
    assert_eq!(ServiceType::from_field(None), Some(ServiceType::BsFriendly));
    assert_eq!(
        ServiceType::from_field(Some("BS-friendly")),
        Some(ServiceType::BsFriendly)
    );
    assert_eq!(ServiceType::from_field(Some("Pro")), Some(ServiceType::Pro));
    assert_eq!(
        ServiceType::from_field(Some("Premium")),
        Some(ServiceType::Premium)
    );
    assert_eq!(ServiceType::from_field(Some("premium")), None);
    assert_eq!(ServiceType::from_field(Some("")), None);
}

#[test]
fn test_service_display_roundtrip() {
    for service in [ServiceType::BsFriendly, ServiceType::Pro, ServiceType::Premium] {
        assert_eq!(service.to_string().parse::<ServiceType>().ok(), Some(service));
    }
}

#[test]
fn test_logical_model_names() {
    let names: Vec<_> = LogicalModel::ALL.iter().map(|m| m.to_string()).collect();
    assert_eq!(names, vec!["BSJCode-1-Stable", "CodeLlama", "Terjman"]);

    assert_eq!(
        serde_json::to_value(LogicalModel::BsjCode1Stable).unwrap(),
        json!("BSJCode-1-Stable")
    );
    assert_eq!(
        "Terjman".parse::<LogicalModel>().ok(),
        Some(LogicalModel::Terjman)
    );
    assert!(matches!(
        "terjman".parse::<LogicalModel>(),
        Err(Error::UnknownName("logical model", name)) if name == "terjman"
    ));
}

#[test]
fn test_unknown_service_name() {
    assert!(matches!(
        "Gold".parse::<ServiceType>(),
        Err(Error::UnknownName("service", name)) if name == "Gold"
    ));
}

#[test]
fn test_response_has_exactly_one_key() {
    assert_eq!(
        serde_json::to_value(Response::output("hello")).unwrap(),
        json!({ "output": "hello" })
    );
    assert_eq!(
        serde_json::to_value(Response::error("Invalid service type")).unwrap(),
        json!({ "error": "Invalid service type" })
    );
}

#[test]
fn test_response_deserialize() {
    let response: Response = serde_json::from_value(json!({ "output": "x" })).unwrap();
    assert_eq!(response.as_output(), Some("x"));
    assert_eq!(response.as_error(), None);

    let response: Response = serde_json::from_value(json!({ "error": "e" })).unwrap();
    assert_eq!(response.as_error(), Some("e"));
}

#[test]
fn test_request_defaults() {
    let request: Request = serde_json::from_value(json!({})).unwrap();
    assert_eq!(request, Request::default());
    assert_eq!(request.input_text(), "");

    let request: Request =
        serde_json::from_value(json!({ "input": "x", "service": null })).unwrap();
    assert_eq!(request, Request::new("x"));

    assert_eq!(
        serde_json::to_value(Request::new("x").with_service("Pro")).unwrap(),
        json!({ "input": "x", "service": "Pro" })
    );
}
