use core::convert::Infallible;
use std::error::Error;

use insta::assert_snapshot;
use paramgraph::{
    CardinalityError, Cause, Declaration, Decoder, Param, Params, Rule, ValueBuilder, rule_for,
};
use paramgraph_testhelpers::{IPanic, test};
use uuid::Uuid;

use super::fixtures::{Dummy, dummy, dummy_params, rejected, with, without};

#[test]
fn decodes_every_shape() -> Result<(), IPanic> {
    let decoded: Dummy = Decoder::new().decode(&dummy_params())?;
    assert_eq!(decoded, dummy());
    Ok(())
}

#[test]
fn decoding_is_idempotent() -> Result<(), IPanic> {
    let decoder = Decoder::new();
    let raw = dummy_params();
    let first: Dummy = decoder.decode(&raw)?;
    let second: Dummy = decoder.decode(&raw)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn missing_optional_fields_are_empty() -> Result<(), IPanic> {
    let raw = without(
        dummy_params(),
        &["opt_string", "opt_uuid", "opt_list", "scope"],
    );
    let decoded: Dummy = Decoder::new().decode(&raw)?;

    assert_eq!(decoded.opt_string, None);
    assert_eq!(decoded.opt_uuid, None);
    assert!(decoded.opt_list.is_empty());
    assert!(decoded.scopes.is_empty());
    assert_eq!(decoded.string, "string1");
    Ok(())
}

#[test]
fn optional_list_with_no_values_is_empty() -> Result<(), IPanic> {
    let raw = with(dummy_params(), "opt_list", &[]);
    let decoded: Dummy = Decoder::new().decode(&raw)?;
    assert!(decoded.opt_list.is_empty());

    let raw = with(dummy_params(), "opt_uuid", &[]);
    let decoded: Dummy = Decoder::new().decode(&raw)?;
    assert_eq!(decoded.opt_uuid, None);
    Ok(())
}

#[test]
fn missing_required_field_keeps_the_prefix() {
    let raw = without(dummy_params(), &["uuid"]);
    let (error, partial) = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).into_parts();

    assert_eq!(error.rule, Rule::Required);
    assert_eq!(error.field, "uuid");
    assert_eq!(error.param.as_deref(), Some("uuid"));
    assert_eq!(error.cardinality(), Some(CardinalityError::ParamIsNull));

    let expected = dummy();
    assert_eq!(partial.string, expected.string);
    assert_eq!(partial.strings, expected.strings);
    assert_eq!(partial.opt_string, expected.opt_string);
    assert_eq!(partial.uuid, Uuid::nil());
    assert!(partial.uuids.is_empty());
    assert_eq!(partial.port, 0);
}

#[test]
fn required_field_with_unparsable_value() {
    let raw = with(dummy_params(), "uuid", &["not-a-uuid"]);
    let (error, partial) = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).into_parts();

    assert!(error.is_required());
    let Cause::Construct(cause) = &error.cause else {
        panic!("expected a construct error, got {:?}", error.cause);
    };
    assert_eq!(cause.value(), "not-a-uuid");
    assert_eq!(partial.opt_string.as_deref(), Some("string1"));
}

#[test]
fn required_field_with_empty_value() {
    let raw = with(dummy_params(), "string", &[""]);
    let error = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).error;

    assert_eq!(error.rule, Rule::Required);
    assert_eq!(error.cardinality(), Some(CardinalityError::EmptyValue));
}

#[test]
fn required_field_with_no_values() {
    let raw = with(dummy_params(), "strings", &[]);
    let (error, partial) = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).into_parts();

    assert_eq!(error.field, "strings");
    assert_eq!(error.cardinality(), Some(CardinalityError::NoItems));
    assert_eq!(partial.string, "string1");
}

#[test]
fn repeated_parameter_is_rejected() {
    let raw = with(dummy_params(), "string", &["a", "b"]);
    let error = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).error;

    assert_eq!(error.rule, Rule::Required);
    assert_eq!(error.cardinality(), Some(CardinalityError::MoreThanOneItem));
}

#[test]
fn optional_field_with_empty_value() {
    let raw = with(dummy_params(), "opt_string", &[""]);
    let (error, partial) = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).into_parts();

    assert_eq!(error.rule, Rule::Optional);
    assert_eq!(error.field, "opt_string");
    assert_eq!(error.cardinality(), Some(CardinalityError::EmptyValue));
    assert_eq!(partial.strings, dummy().strings);
    assert_eq!(partial.opt_string, None);
}

#[test]
fn optional_field_with_unparsable_value() {
    let raw = with(dummy_params(), "opt_uuid", &["nope"]);
    let (error, partial) = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).into_parts();

    assert_eq!(error.rule, Rule::Optional);
    assert!(matches!(&error.cause, Cause::Construct(cause) if cause.value() == "nope"));
    assert_eq!(partial.uuids, dummy().uuids);
    assert_eq!(partial.opt_uuid, None);
}

#[test]
fn unparsable_list_item() {
    let raw = with(dummy_params(), "uuids", &[&format!("{} nope", super::fixtures::UUID)]);
    let error = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).error;

    assert_eq!(error.field, "uuids");
    assert!(matches!(&error.cause, Cause::Construct(cause) if cause.value() == "nope"));
}

#[test]
fn value_outside_the_whitelist_is_always_required() {
    let raw = with(dummy_params(), "scope", &["openid bogus"]);
    let (error, partial) = rejected(Decoder::new().decode::<Dummy, _, _, _, _>(&raw)).into_parts();

    assert_eq!(error.rule, Rule::Required);
    assert_eq!(error.field, "scopes");
    assert_eq!(error.param.as_deref(), Some("scope"));
    let Cause::Value(cause) = &error.cause else {
        panic!("expected a value error, got {:?}", error.cause);
    };
    assert_eq!(cause.value, "bogus");
    assert_eq!(cause.param, "scope");
    assert_eq!(partial.opt_list, dummy().opt_list);
    assert!(partial.scopes.is_empty());
}

#[derive(Debug, Default)]
struct Prompt {
    mode: Option<String>,
}

impl Params for Prompt {
    fn declare(decl: &mut Declaration<Self>) {
        decl.optional(
            "mode",
            Param::new("display").optional().expected(["page", "popup"]),
            |d, v: Option<String>| d.mode = v,
        );
    }
}

#[test]
fn optional_value_outside_the_whitelist_is_required() -> Result<(), IPanic> {
    let decoded: Prompt = Decoder::new().decode([("display", ["POPUP"])])?;
    assert_eq!(decoded.mode.as_deref(), Some("POPUP"));

    let (error, partial) =
        rejected(Decoder::new().decode::<Prompt, _, _, _, _>([("display", ["warp"])])).into_parts();
    assert_eq!(error.rule, Rule::Required);
    assert_eq!(error.field, "mode");
    assert_eq!(error.param.as_deref(), Some("display"));
    let Cause::Value(cause) = &error.cause else {
        panic!("expected a value error, got {:?}", error.cause);
    };
    assert_eq!(cause.value, "warp");
    assert_eq!(partial.mode, None);
    Ok(())
}

#[test]
fn whitelist_ignores_case() -> Result<(), IPanic> {
    let raw = with(dummy_params(), "scope", &["OpenID EMAIL"]);
    let decoded: Dummy = Decoder::new().decode(&raw)?;
    assert_eq!(decoded.scopes, ["OpenID", "EMAIL"]);
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
struct Strings {
    strings: Vec<String>,
}

impl Params for Strings {
    fn declare(decl: &mut Declaration<Self>) {
        decl.list("strings", Param::new("strings"), |s, v: Vec<String>| {
            s.strings = v
        });
    }
}

#[test]
fn list_value_is_split_on_the_delimiter() -> Result<(), IPanic> {
    let decoded: Strings = Decoder::new().decode([("strings", ["a b c"])])?;
    assert_eq!(decoded.strings, ["a", "b", "c"]);

    let decoded: Strings = Decoder::new().decode([("strings", ["  a  b "])])?;
    assert_eq!(decoded.strings, ["a", "b"]);
    Ok(())
}

#[derive(Debug, Default)]
struct Tags {
    first_only: Vec<String>,
    all: Vec<String>,
}

impl Params for Tags {
    fn declare(decl: &mut Declaration<Self>) {
        decl.list(
            "first_only",
            Param::new("first_only").allow_many(),
            |t, v: Vec<String>| t.first_only = v,
        )
        .list(
            "all",
            Param::new("all").allow_many().parsable().delimiter(","),
            |t, v: Vec<String>| t.all = v,
        );
    }
}

#[test]
fn parsable_lists_split_every_value() -> Result<(), IPanic> {
    let decoded: Tags = Decoder::new().decode([
        ("first_only", ["a b", "c d"]),
        ("all", ["x,y", "z"]),
    ])?;
    assert_eq!(decoded.first_only, ["a", "b", "c d"]);
    assert_eq!(decoded.all, ["x", "y", "z"]);
    Ok(())
}

#[test]
fn repeated_list_values_are_all_kept() -> Result<(), IPanic> {
    let decoded: Tags = Decoder::new().decode([("first_only", &["x", "y", "z"][..]), ("all", &["w"][..])])?;
    assert_eq!(decoded.first_only, ["x", "y", "z"]);
    assert_eq!(decoded.all, ["w"]);
    Ok(())
}

#[derive(Debug, Default)]
struct Authorize {
    response_type: String,
}

impl Params for Authorize {
    fn declare(decl: &mut Declaration<Self>) {
        decl.scalar(
            "response_type",
            Param::new("response_type").expected(["code", "token"]),
            |a, v: String| a.response_type = v,
        );
    }
}

#[test]
fn scalar_whitelist_checks_every_token() -> Result<(), IPanic> {
    let decoded: Authorize = Decoder::new().decode([("response_type", ["code token"])])?;
    assert_eq!(decoded.response_type, "code token");

    let error = rejected(
        Decoder::new().decode::<Authorize, _, _, _, _>([("response_type", ["code id_token"])]),
    )
    .error;
    assert!(matches!(&error.cause, Cause::Value(cause) if cause.value == "id_token"));
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
struct Paging {
    page: u32,
    size: u32,
}

impl Params for Paging {
    fn declare(decl: &mut Declaration<Self>) {
        decl.scalar("page", Param::new("page").optional(), |p, v: u32| p.page = v)
            .scalar("size", Param::new("size").optional(), |p, v: u32| p.size = v);
    }
}

#[test]
fn optional_scalars() -> Result<(), IPanic> {
    let decoded: Paging = Decoder::new().decode([("page", ["3"])])?;
    assert_eq!(decoded, Paging { page: 3, size: 0 });

    let error =
        rejected(Decoder::new().decode::<Paging, _, _, _, _>([("size", ["big"])])).error;
    assert_eq!(error.rule, Rule::Optional);
    assert_eq!(error.field, "size");
    Ok(())
}

#[test]
fn canonical_strings_round_trip() -> Result<(), IPanic> {
    let decoder = Decoder::new();
    for page in [0, 1, 42, u32::MAX] {
        let decoded: Paging = decoder.decode([("page", [page.to_string()])])?;
        assert_eq!(decoded.page, page);
    }

    let uuid = Uuid::from_u128(0xa1a2a3a4_b1b2_c1c2_d1d2_d3d4d5d6d7d8);
    let decoded: Dummy = decoder.decode(&with(dummy_params(), "uuid", &[&uuid.to_string()]))?;
    assert_eq!(decoded.uuid, uuid);
    Ok(())
}

#[test]
fn registered_builder_overrides_the_fallback() -> Result<(), IPanic> {
    let decoder = Decoder::builder()
        .register(ValueBuilder::new(|raw: &str| {
            Ok::<_, Infallible>(raw.to_uppercase())
        }))
        .build();

    let decoded: Strings = decoder.decode([("strings", ["a b"])])?;
    assert_eq!(decoded.strings, ["A", "B"]);
    Ok(())
}

#[test]
fn cardinality_rules() {
    let values = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let required = rule_for(true);
    let optional = rule_for(false);

    assert_eq!(required.run(None, false), Err(CardinalityError::ParamIsNull));
    assert_eq!(required.run(Some(&[]), false), Err(CardinalityError::NoItems));
    assert_eq!(
        required.run(Some(&values(&[""])), false),
        Err(CardinalityError::EmptyValue)
    );
    assert_eq!(
        required.run(Some(&values(&["a", "b"])), false),
        Err(CardinalityError::MoreThanOneItem)
    );
    assert_eq!(required.run(Some(&values(&["a", "b"])), true), Ok(()));
    assert_eq!(optional.run(None, false), Ok(()));
    assert_eq!(optional.run(Some(&[]), false), Ok(()));
}

#[test]
fn error_messages() {
    let missing = rejected(
        Decoder::new().decode::<Dummy, _, _, _, _>(&without(dummy_params(), &["uuid"])),
    )
    .error;
    assert_snapshot!(missing, @"required field failed validation. field: uuid, param: uuid");
    assert_snapshot!(missing.source().unwrap(), @"parameter is null");

    let optional = rejected(
        Decoder::new().decode::<Dummy, _, _, _, _>(&with(dummy_params(), "opt_string", &[""])),
    )
    .error;
    assert_snapshot!(optional, @"optional field failed validation. field: opt_string, param: opt_string");
    assert_snapshot!(optional.source().unwrap(), @"parameter had no value");

    let value = rejected(
        Decoder::new().decode::<Dummy, _, _, _, _>(&with(dummy_params(), "scope", &["openid bogus"])),
    )
    .error;
    assert_snapshot!(value.source().unwrap(), @r#"input value "bogus" is not supported"#);

    let port = rejected(
        Decoder::new().decode::<Dummy, _, _, _, _>(&with(dummy_params(), "port", &["eighty"])),
    )
    .error;
    let construct = port.source().unwrap();
    assert_snapshot!(construct.source().unwrap(), @"invalid digit found in string");
}
