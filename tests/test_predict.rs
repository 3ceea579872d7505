mod common;

use llm_adapter::{
    runtime::mock::EchoBackend, Error, LogicalModel, Request, Response, INPUT_REQUIRED,
    INVALID_SERVICE,
};
use proptest::prelude::*;
use serde_json::json;

fn random_service() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("BS-friendly".to_string())),
        Just(Some("Pro".to_string())),
        Just(Some("Premium".to_string())),
        any::<String>().prop_map(Some),
    ]
}

fn unknown_service() -> impl Strategy<Value = String> {
    any::<String>().prop_filter("must not be a known service", |s| {
        !matches!(s.as_str(), "BS-friendly" | "Pro" | "Premium")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_missing_input_is_rejected(service in random_service(), empty in any::<bool>()) {
        let adapter = common::loaded_echo_adapter().unwrap();
        let request = Request {
            input: if empty { Some(String::new()) } else { None },
            service,
        };

        let response = adapter.predict(&request).unwrap();
        prop_assert_eq!(response, Response::error(INPUT_REQUIRED));
        prop_assert_eq!(adapter.backend().generations(), 0);
    }

    #[test]
    fn test_unknown_service_is_rejected(input in ".+", service in unknown_service()) {
        let adapter = common::loaded_echo_adapter().unwrap();
        let request = Request::new(input).with_service(service);

        let response = adapter.predict(&request).unwrap();
        prop_assert_eq!(response, Response::error(INVALID_SERVICE));
        prop_assert_eq!(adapter.backend().generations(), 0);
    }
}

#[test]
fn test_default_service_uses_bsjcode() -> Result<(), Error> {
    common::enable_logging();
    let adapter = common::loaded_echo_adapter()?;

    let response = adapter.predict(&Request::new("x"))?;

    assert_eq!(
        response,
        Response::output(EchoBackend::echo(LogicalModel::BsjCode1Stable, "x"))
    );
    assert_eq!(adapter.backend().generations(), 1);

    Ok(())
}

#[test]
fn test_explicit_bs_friendly_matches_default() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    let explicit = adapter.predict(&Request::new("x").with_service("BS-friendly"))?;
    let default = adapter.predict(&Request::new("x"))?;

    assert_eq!(explicit, default);

    Ok(())
}

#[test]
fn test_pro_service_uses_codellama() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    let response = adapter.predict(&Request::new("x").with_service("Pro"))?;

    assert_eq!(
        response,
        Response::output(EchoBackend::echo(LogicalModel::CodeLlama, "x"))
    );
    assert_eq!(adapter.backend().generations(), 1);

    Ok(())
}

#[test]
fn test_premium_service_chains_three_models() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    let response = adapter.predict(&Request::new("x").with_service("Premium"))?;

    let expected = EchoBackend::echo(
        LogicalModel::Terjman,
        &EchoBackend::echo(
            LogicalModel::CodeLlama,
            &EchoBackend::echo(LogicalModel::BsjCode1Stable, "x"),
        ),
    );

    assert_eq!(response, Response::output(expected));
    assert_eq!(
        response.as_output(),
        Some("Terjman: CodeLlama: BSJCode-1-Stable: x")
    );
    assert_eq!(adapter.backend().generations(), 3);

    Ok(())
}

#[test]
fn test_service_matching_is_case_sensitive() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    for service in ["pro", "PREMIUM", "bs-friendly", " Pro", ""] {
        let response = adapter.predict(&Request::new("x").with_service(service))?;
        assert_eq!(response, Response::error(INVALID_SERVICE), "{service:?}");
    }

    Ok(())
}

#[test]
fn test_whitespace_input_is_forwarded() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    let response = adapter.predict(&Request::new(" "))?;

    assert_eq!(
        response,
        Response::output(EchoBackend::echo(LogicalModel::BsjCode1Stable, " "))
    );

    Ok(())
}

#[test]
fn test_predict_before_load_fails_with_lookup_error() {
    let adapter = common::echo_adapter();

    for service in ["BS-friendly", "Pro", "Premium"] {
        let result = adapter.predict(&Request::new("x").with_service(service));
        assert!(
            matches!(result, Err(Error::ModelNotLoaded(_))),
            "{service}: {result:?}"
        );
    }
}

#[test]
fn test_validation_happens_before_lookup() -> Result<(), Error> {
    // Input and routing errors do not need loaded models
    let adapter = common::echo_adapter();

    assert_eq!(
        adapter.predict(&Request::default())?,
        Response::error(INPUT_REQUIRED)
    );
    assert_eq!(
        adapter.predict(&Request::new("x").with_service("Gold"))?,
        Response::error(INVALID_SERVICE)
    );

    Ok(())
}

#[test]
fn test_predict_json() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    assert_eq!(
        adapter.predict_json(json!({ "input": "x", "service": "Pro" }))?,
        json!({ "output": "CodeLlama: x" })
    );
    assert_eq!(
        adapter.predict_json(json!({ "service": "Pro" }))?,
        json!({ "error": "Input text is required" })
    );
    assert_eq!(
        adapter.predict_json(json!({ "input": null }))?,
        json!({ "error": "Input text is required" })
    );
    assert_eq!(
        adapter.predict_json(json!({ "input": "x", "service": "Platinum" }))?,
        json!({ "error": "Invalid service type" })
    );
    assert_eq!(
        adapter.predict_json(json!({ "input": "x", "extra": 1 }))?,
        json!({ "output": "BSJCode-1-Stable: x" })
    );

    Ok(())
}

#[test]
fn test_predict_json_null_service_is_invalid() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    assert_eq!(
        adapter.predict_json(json!({ "input": "x", "service": null }))?,
        json!({ "error": "Invalid service type" })
    );
    assert_eq!(adapter.backend().generations(), 0);

    Ok(())
}

#[test]
fn test_predict_json_non_string_service_is_invalid() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    for service in [json!(5), json!(true), json!(["Pro"]), json!({ "name": "Pro" })] {
        assert_eq!(
            adapter.predict_json(json!({ "input": "x", "service": service }))?,
            json!({ "error": "Invalid service type" }),
            "{service}"
        );
    }
    assert_eq!(adapter.backend().generations(), 0);

    Ok(())
}

#[test]
fn test_predict_json_checks_input_before_service() -> Result<(), Error> {
    let adapter = common::loaded_echo_adapter()?;

    for service in [json!(5), json!(null), json!("Platinum"), json!("Pro")] {
        assert_eq!(
            adapter.predict_json(json!({ "input": "", "service": service.clone() }))?,
            json!({ "error": "Input text is required" }),
            "{service}"
        );
        assert_eq!(
            adapter.predict_json(json!({ "service": service.clone() }))?,
            json!({ "error": "Input text is required" }),
            "{service}"
        );
    }

    Ok(())
}

#[test]
fn test_predict_json_rejects_non_mapping() {
    let adapter = common::loaded_echo_adapter().unwrap();

    for request in [json!(["x"]), json!("x"), json!(null), json!(1)] {
        let result = adapter.predict_json(request);
        assert!(matches!(result, Err(Error::MalformedRequest(_))), "{result:?}");
    }
    assert_eq!(adapter.backend().generations(), 0);
}

#[test]
fn test_predict_json_rejects_non_string_input() {
    let adapter = common::loaded_echo_adapter().unwrap();

    let result = adapter.predict_json(json!({ "input": 5, "service": "Pro" }));
    assert!(matches!(result, Err(Error::MalformedRequest(_))), "{result:?}");
}
