// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::import::ImportKind;
use mj_core::ResourceKind;

const LIST_CHAIN: &str = r#"{
    "version": "1",
    "list": [
        {
            "id": "set_region",
            "module": "g.region",
            "inputs": [{"param": "raster", "value": "elevation@PERMANENT"}],
            "flags": "p"
        },
        {
            "id": 2,
            "module": "r.slope.aspect",
            "inputs": [{"param": "elevation", "value": "elevation@PERMANENT"}],
            "outputs": [{"param": "slope", "value": "slope",
                         "export": {"type": "raster", "format": "GTiff"}}],
            "overwrite": true
        }
    ]
}"#;

#[test]
fn parses_list_layout_in_declaration_order() {
    let chain = ProcessChain::from_json(LIST_CHAIN).unwrap();
    assert_eq!(chain.version, "1");
    let ids: Vec<_> = chain.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["set_region", "2"]);

    let StepCall::Module { module, outputs, overwrite, flags, .. } = &chain.steps[1].call else {
        panic!("expected module call");
    };
    assert_eq!(module, "r.slope.aspect");
    assert!(overwrite);
    assert!(flags.is_empty());
    let export = outputs[0].export.as_ref().unwrap();
    assert_eq!(export.kind, ResourceKind::Raster);
    assert_eq!(export.format.as_deref(), Some("GTiff"));
}

#[test]
fn legacy_layout_orders_numerically() {
    let raw = r#"{
        "version": 1,
        "10": {"module": "r.info", "inputs": {"map": "b"}},
        "2": {"module": "r.info", "inputs": {"map": "a"}},
        "1": {"module": "g.region", "inputs": {"raster": "a"}}
    }"#;
    let chain = ProcessChain::from_json(raw).unwrap();
    let ids: Vec<_> = chain.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "10"]);
    assert_eq!(chain.version, "1");
}

#[test]
fn legacy_output_key_doubles_as_name() {
    let raw = r#"{
        "version": "1",
        "1": {"module": "r.mapcalc", "inputs": {"expression": "out = 1"},
              "outputs": {"out": {"export": {"type": "raster", "format": "GTiff"}}}}
    }"#;
    let chain = ProcessChain::from_json(raw).unwrap();
    let StepCall::Module { outputs, .. } = &chain.steps[0].call else {
        panic!("expected module call");
    };
    assert_eq!(outputs[0].param, "out");
    assert_eq!(outputs[0].value, "out");
}

#[test]
fn map_input_lists_are_joined() {
    let raw = r#"{"version": "1", "list": [
        {"id": "p", "module": "r.patch", "inputs": {"input": ["a@m1", "b@m2"]},
         "outputs": {"output": {"name": "ab"}}}
    ]}"#;
    let chain = ProcessChain::from_json(raw).unwrap();
    let StepCall::Module { inputs, outputs, .. } = &chain.steps[0].call else {
        panic!("expected module call");
    };
    assert_eq!(inputs[0].value, "a@m1,b@m2");
    assert_eq!(outputs[0].value, "ab");
}

#[test]
fn import_descriptor_is_parsed() {
    let raw = r#"{"version": "1", "list": [
        {"id": "i", "module": "r.info", "inputs": [
            {"param": "map", "value": "dem",
             "import_descr": {"source": "https://example.com/dem.tif", "type": "raster"}}
        ]}
    ]}"#;
    let chain = ProcessChain::from_json(raw).unwrap();
    let StepCall::Module { inputs, .. } = &chain.steps[0].call else {
        panic!("expected module call");
    };
    let descr = inputs[0].import.as_ref().unwrap();
    assert_eq!(descr.kind, ImportKind::Raster);
    assert_eq!(descr.source, "https://example.com/dem.tif");
}

#[test]
fn exe_steps_keep_params() {
    let raw = r#"{"version": "1", "list": [
        {"id": "e", "exe": "gdalinfo", "params": ["-stats", 3]}
    ]}"#;
    let chain = ProcessChain::from_json(raw).unwrap();
    assert_eq!(
        chain.steps[0].call,
        StepCall::Exec { exe: "gdalinfo".into(), params: vec!["-stats".into(), "3".into()] }
    );
    assert_eq!(chain.steps[0].call.program(), "gdalinfo");
}

#[yare::parameterized(
    not_object        = { r#"[1, 2]"# },
    no_version        = { r#"{"list": []}"# },
    list_not_array    = { r#"{"version": "1", "list": {}}"# },
    missing_id        = { r#"{"version": "1", "list": [{"module": "r.info"}]}"# },
    missing_module    = { r#"{"version": "1", "list": [{"id": "a"}]}"# },
    module_and_exe    = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "exe": "ls"}]}"# },
    legacy_bad_key    = { r#"{"version": "1", "first": {"module": "r.info"}}"# },
    output_no_value   = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "outputs": [{"param": "out"}]}]}"# },
    output_no_param   = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "outputs": [{"value": "x"}]}]}"# },
    input_no_value    = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "inputs": [{"param": "map"}]}]}"# },
    inputs_scalar     = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "inputs": "map=x"}]}"# },
    bad_flags         = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "flags": "-g"}]}"# },
    overwrite_string  = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "overwrite": "yes"}]}"# },
    bad_import_type   = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "inputs": [{"param": "map", "value": "x", "import_descr": {"source": "https://h/x.tif", "type": "video"}}]}]}"# },
    bad_export_type   = { r#"{"version": "1", "list": [{"id": "a", "module": "r.info", "outputs": [{"param": "out", "value": "x", "export": {"type": "image"}}]}]}"# },
    not_json          = { r#"{"version": "1""# },
)]
fn rejects_malformed_chains(raw: &str) {
    assert!(ProcessChain::from_json(raw).is_err());
}

#[test]
fn missing_module_names_the_key() {
    let err = ProcessChain::from_json(r#"{"version": "1", "list": [{"id": "a"}]}"#).unwrap_err();
    assert!(matches!(err, ValidationError::MissingKey { key: "module", .. }));
}
