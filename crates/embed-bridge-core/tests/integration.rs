//! Integration tests for embed-bridge-core.
//!
//! These tests drive the complete pipeline:
//! - Payload evaluation in the global scope
//! - Factory resolution by naming convention
//! - Argument and result conversion
//! - Failure classification and stage reporting

use embed_bridge_common::{BridgeConfig, BridgeError, EngineConfig, Stage};
use embed_bridge_core::naming::{entry_point_name, resource_identifier};
use embed_bridge_core::{CallArg, EmbeddedResource, ScriptContext, call_embedded};

/// Shape of a bundled module: a top-level factory per module.
static FOO_LIB: EmbeddedResource = EmbeddedResource::from_static(
    "my_foo_lib_mjs",
    b"var __modules = {};\n\
      function require_foo() {\n\
          return function foo(bar, baz) { return bar * 10 + baz; };\n\
      }\0",
);

// ============================================================================
// Test: Round Trip
// ============================================================================

#[test]
fn test_add_round_trip() {
    let resource = EmbeddedResource::from_static(
        "sum_js",
        b"function require_sum() { return function (a, b) { return a + b; }; }\0",
    );

    let result = call_embedded(
        &BridgeConfig::default(),
        &resource,
        "sum",
        &[CallArg::Int(3), CallArg::Int(4)],
    );

    assert_eq!(result.unwrap(), 7);
}

#[test]
fn test_determine_basal_scenario() {
    let ident = resource_identifier("determine-basal.mjs");
    assert_eq!(ident, "determine_basal_mjs");
    assert_eq!(entry_point_name(&ident), "require_determine_basal_mjs");

    let resource = EmbeddedResource::from_static(
        "determine_basal_mjs",
        b"var require_determine_basal_mjs = function () { return (a, b) => a - b; };\0",
    );

    let result = call_embedded(
        &BridgeConfig::default(),
        &resource,
        &ident,
        &[CallArg::Int(10), CallArg::Int(3)],
    );

    assert_eq!(result.unwrap(), 7);
}

#[test]
fn test_bundled_module() {
    let result = call_embedded(
        &BridgeConfig::default(),
        &FOO_LIB,
        "foo",
        &[CallArg::Int(4), CallArg::Int(2)],
    );

    assert_eq!(result.unwrap(), 42);
}

// ============================================================================
// Test: Argument Passing
// ============================================================================

#[test]
fn test_arguments_arrive_in_order() {
    let resource = EmbeddedResource::from_static(
        "echo_js",
        b"function require_echo() {\n\
              return function () {\n\
                  var digits = 0;\n\
                  for (var i = 0; i < arguments.length; i++) {\n\
                      digits = digits * 10 + arguments[i];\n\
                  }\n\
                  return arguments.length * 100000 + digits;\n\
              };\n\
          }\0",
    );
    let args: Vec<CallArg> = [1, 2, 3, 4].into_iter().map(CallArg::Int).collect();

    let result = call_embedded(&BridgeConfig::default(), &resource, "echo", &args);

    // 4 arguments, digits 1234
    assert_eq!(result.unwrap(), 401_234);
}

#[test]
fn test_zero_arguments() {
    let resource = EmbeddedResource::from_static(
        "count_js",
        b"function require_count() { return function () { return arguments.length; }; }",
    );

    let result = call_embedded(&BridgeConfig::default(), &resource, "count", &[]);

    assert_eq!(result.unwrap(), 0);
}

#[test]
fn test_json_argument() {
    let resource = EmbeddedResource::from_static(
        "profile_js",
        b"function require_profile() {\n\
              return function (profile, extra) { return profile.max_basal * 2 + extra; };\n\
          }\0",
    );
    let profile = serde_json::json!({ "max_basal": 20 }).to_string();

    let result = call_embedded(
        &BridgeConfig::default(),
        &resource,
        "profile",
        &[CallArg::Json(profile), CallArg::Int(2)],
    );

    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_invalid_json_argument() {
    let resource = EmbeddedResource::from_static(
        "profile_js",
        b"function require_profile() { return function (p) { return 1; }; }\0",
    );

    let result = call_embedded(
        &BridgeConfig::default(),
        &resource,
        "profile",
        &[CallArg::Int(0), CallArg::Json("{not json".into())],
    );

    match result {
        Err(BridgeError::ArgumentConversionFailed { index, .. }) => assert_eq!(index, 1),
        other => panic!("Expected ArgumentConversionFailed, got {other:?}"),
    }
}

#[test]
fn test_receiver_is_global_object() {
    let resource = EmbeddedResource::from_static(
        "receiver_js",
        b"var answer = 42;\n\
          function require_receiver() {\n\
              var outer = this.answer;\n\
              return function () { return this.answer + outer; };\n\
          }\0",
    );

    let result = call_embedded(&BridgeConfig::default(), &resource, "receiver", &[]);

    assert_eq!(result.unwrap(), 84);
}

// ============================================================================
// Test: Failure Classification
// ============================================================================

#[test]
fn test_null_resource_is_side_effect_free() {
    let context = ScriptContext::new(&EngineConfig::default()).unwrap();

    let result = context.load_module(&EmbeddedResource::null("missing"), "missing");
    assert!(matches!(result, Err(BridgeError::NoData { .. })));

    // The context is untouched and still usable.
    let entry = context
        .load_module(
            &EmbeddedResource::from_static(
                "ok_js",
                b"function require_ok() { return function () { return 1; }; }",
            ),
            "ok",
        )
        .unwrap();
    assert_eq!(context.invoke(&entry, &[]).unwrap(), 1);
}

#[test]
fn test_invalid_source_never_yields_callable() {
    let payloads: [&'static [u8]; 3] = [b"}{\0", b"function require_x( {\0", b"var = 1;\0"];

    for payload in payloads {
        let resource = EmbeddedResource::from_static("bad_js", payload);
        let result = call_embedded(&BridgeConfig::default(), &resource, "x", &[]);

        let err = result.unwrap_err();
        assert!(
            matches!(err, BridgeError::EvaluationFailed { .. }),
            "Expected EvaluationFailed, got {err:?}"
        );
        assert_eq!(err.stage(), Stage::ContextReady);
    }
}

#[test]
fn test_wrong_module_name() {
    let result = call_embedded(&BridgeConfig::default(), &FOO_LIB, "bar", &[]);

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::EntryPointNotFound { ref entry_point } if entry_point == "require_bar"
    ));
    assert_eq!(err.stage(), Stage::ModuleEvaluated);
}

#[test]
fn test_call_raises() {
    let resource = EmbeddedResource::from_static(
        "fail_js",
        b"function require_fail() { return function () { throw new RangeError('out of range'); }; }",
    );

    let result = call_embedded(&BridgeConfig::default(), &resource, "fail", &[]);

    match result {
        Err(BridgeError::CallFailed { module, detail }) => {
            assert_eq!(module, "fail");
            assert!(detail.is_some_and(|d| d.contains("out of range")));
        }
        other => panic!("Expected CallFailed, got {other:?}"),
    }
}

#[test]
fn test_undefined_result_is_call_failure() {
    let resource = EmbeddedResource::from_static(
        "void_js",
        b"function require_void() { return function () {}; }",
    );

    let result = call_embedded(&BridgeConfig::default(), &resource, "void", &[]);

    match result {
        Err(BridgeError::CallFailed { detail, .. }) => assert!(detail.is_none()),
        other => panic!("Expected CallFailed, got {other:?}"),
    }
}

#[test]
fn test_entry_from_other_context_rejected() {
    let config = EngineConfig::default();
    let owner = ScriptContext::new(&config).unwrap();
    let stranger = ScriptContext::new(&config).unwrap();
    let entry = owner.load_module(&FOO_LIB, "foo").unwrap();

    let result = stranger.invoke(&entry, &[CallArg::Int(1), CallArg::Int(2)]);

    assert!(matches!(result, Err(BridgeError::CallFailed { .. })));
    // Still callable where it belongs.
    assert_eq!(owner.invoke(&entry, &[1.into(), 2.into()]).unwrap(), 12);
}

// ============================================================================
// Test: Engine Limits
// ============================================================================

#[test]
fn test_memory_limit_enforced() {
    let mut config = BridgeConfig::default();
    config.engine.memory_limit_mb = 4;

    let resource = EmbeddedResource::from_static(
        "hog_js",
        b"var hog = [];\n\
          for (var i = 0; i < 1000000; i++) { hog.push('x' + i); }\n\
          function require_hog() { return function () { return hog.length; }; }\0",
    );

    let result = call_embedded(&config, &resource, "hog", &[]);

    match result {
        Err(BridgeError::EvaluationFailed { exception, .. }) => {
            assert!(exception.contains("out of memory"), "unexpected text: {exception}");
        }
        other => panic!("Expected EvaluationFailed, got {other:?}"),
    }
}

#[test]
fn test_independent_contexts_are_isolated() {
    let config = EngineConfig::default();
    let first = ScriptContext::new(&config).unwrap();
    let second = ScriptContext::new(&config).unwrap();

    assert!(first.load_module(&FOO_LIB, "foo").is_ok());

    // `require_foo` exists only in the context that evaluated it.
    let empty = EmbeddedResource::from_static("empty_js", b"\0");
    let result = second.load_module(&empty, "foo");
    assert!(matches!(result, Err(BridgeError::EntryPointNotFound { .. })));
}
