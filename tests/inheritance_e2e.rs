//! End-to-end inheritance scenarios
//!
//! Each test drives the public API the way a view loader would: parse a
//! base document and a patch document, apply, serialize, compare.

use pretty_assertions::assert_eq;
use viewgraft::{apply_specs, parse_document, to_xml, ApplyError, Rewriter, REPLACED_TAG_ATTR};

fn rewrite(base: &str, patch: &str) -> String {
    let source = parse_document(base).unwrap();
    let specs = parse_document(patch).unwrap();
    to_xml(&apply_specs(source, specs).unwrap())
}

fn rewrite_branded(base: &str, patch: &str) -> String {
    let source = parse_document(base).unwrap();
    let specs = parse_document(patch).unwrap();
    to_xml(&Rewriter::new().branding(true).apply(source, specs).unwrap())
}

fn rewrite_err(base: &str, patch: &str) -> ApplyError {
    let source = parse_document(base).unwrap();
    let specs = parse_document(patch).unwrap();
    apply_specs(source, specs).unwrap_err()
}

#[test]
fn append_after_a_field() {
    assert_eq!(
        rewrite(
            r#"<form><group name="g"><field name="a"/></group></form>"#,
            r#"<field name="a" position="after"><field name="b"/></field>"#,
        ),
        r#"<form><group name="g"><field name="a"/><field name="b"/></group></form>"#
    );
}

#[test]
fn attribute_add_and_remove() {
    assert_eq!(
        rewrite(
            r#"<form><field name="a" class="x y z"/></form>"#,
            r#"<field name="a" position="attributes"><attribute name="class" add="w" remove="y" separator=" "/></field>"#,
        ),
        r#"<form><field name="a" class="x z w"/></form>"#
    );
}

#[test]
fn replace_with_wrap_placeholder() {
    assert_eq!(
        rewrite(
            r#"<form><field name="a"/></form>"#,
            r#"<field name="a" position="replace"><div class="wrap">$0</div></field>"#,
        ),
        r#"<form><div class="wrap"><field name="a"/></div></form>"#
    );
}

#[test]
fn move_into_another_group() {
    assert_eq!(
        rewrite(
            r#"<form><group name="g1"><field name="a"/></group><group name="g2"/></form>"#,
            r#"<xpath expr="//group[@name='g2']" position="inside"><field name="a" position="move"/></xpath>"#,
        ),
        r#"<form><group name="g1"/><group name="g2"><field name="a"/></group></form>"#
    );
}

#[test]
fn root_replacement_preserves_template_name() {
    assert_eq!(
        rewrite(
            r#"<t t-name="tmpl"><span/></t>"#,
            r#"<xpath expr="/t" position="replace"><div/></xpath>"#,
        ),
        r#"<div t-name="tmpl"/>"#
    );
}

#[test]
fn branding_stamps_the_replaced_tag() {
    assert_eq!(
        rewrite_branded(
            r#"<form><field name="a"/></form>"#,
            r#"<field name="a" position="replace"><div class="wrap">$0</div></field>"#,
        ),
        r#"<form><div class="wrap" data-replaced-tag="field"><field name="a"/></div></form>"#
    );
    assert_eq!(REPLACED_TAG_ATTR, "data-replaced-tag");
}

#[test]
fn before_and_inside_directives() {
    assert_eq!(
        rewrite(
            r#"<form><field name="b"/></form>"#,
            r#"<field name="b" position="before"><field name="a"/></field>"#,
        ),
        r#"<form><field name="a"/><field name="b"/></form>"#
    );
    assert_eq!(
        rewrite(
            r#"<form><group name="g"/></form>"#,
            r#"<group name="g"><field name="a"/></group>"#,
        ),
        r#"<form><group name="g"><field name="a"/></group></form>"#
    );
}

#[test]
fn tail_text_survives_removal() {
    assert_eq!(
        rewrite(
            "<form><a/>tail<b/></form>",
            r#"<xpath expr="//a" position="replace"/>"#,
        ),
        "<form>tail<b/></form>"
    );
}

#[test]
fn moving_there_and_back_is_a_no_op() {
    let base = r#"<form><group name="g1"><field name="a"/></group><group name="g2"/></form>"#;
    assert_eq!(
        rewrite(
            base,
            r#"<data>
<xpath expr="//group[@name='g2']" position="inside"><field name="a" position="move"/></xpath>
<xpath expr="//group[@name='g1']" position="inside"><field name="a" position="move"/></xpath>
</data>"#,
        ),
        base
    );
}

#[test]
fn synthetic_inverse_restores_the_attribute() {
    let base = r#"<form><field name="a" class="x y"/></form>"#;
    let patched = rewrite(
        base,
        r#"<field name="a" position="attributes"><attribute name="class" add="z" remove="y" separator=" "/></field>"#,
    );
    assert_eq!(patched, r#"<form><field name="a" class="x z"/></form>"#);
    assert_eq!(
        rewrite(
            &patched,
            r#"<field name="a" position="attributes"><attribute name="class" add="y" remove="z" separator=" "/></field>"#,
        ),
        r#"<form><field name="a" class="x y"/></form>"#
    );
}

#[test]
fn add_concatenates_and_remove_is_set_difference() {
    // Removing a token that is not present changes nothing.
    assert_eq!(
        rewrite(
            r#"<form><field name="a" class="x"/></form>"#,
            r#"<field name="a" position="attributes"><attribute name="class" remove="zz" separator=" "/></field>"#,
        ),
        r#"<form><field name="a" class="x"/></form>"#
    );
    // Adding an already present token twice keeps both copies.
    assert_eq!(
        rewrite(
            r#"<form><field name="a" class="x"/></form>"#,
            r#"<field name="a" position="attributes"><attribute name="class" add="x x" separator=" "/></field>"#,
        ),
        r#"<form><field name="a" class="x x x"/></form>"#
    );
}

#[test]
fn comment_prefixed_root_replacement() {
    assert_eq!(
        rewrite(
            r#"<t t-name="tmpl"><span/></t>"#,
            r#"<xpath expr="/t" position="replace"><!-- keep --><section>txt</section></xpath>"#,
        ),
        r#"<section t-name="tmpl"><!-- keep -->txt</section>"#
    );
}

#[test]
fn moves_nested_inside_a_replacement_payload() {
    // Rearranging a subtree while pulling a base node into it.
    assert_eq!(
        rewrite(
            r#"<form><header><button name="go"/></header><footer/></form>"#,
            r#"<xpath expr="//footer" position="replace"><div class="bar"><button name="go" position="move"/></div></xpath>"#,
        ),
        r#"<form><header/><div class="bar"><button name="go"/></div></form>"#
    );
}

#[test]
fn unknown_position_is_fatal() {
    let err = rewrite_err(
        r#"<form><field name="a"/></form>"#,
        r#"<field name="a" position="sideways"/>"#,
    );
    assert!(matches!(err, ApplyError::UnknownPosition { .. }));
}

#[test]
fn unlocatable_spec_is_fatal() {
    let err = rewrite_err(r#"<form/>"#, r#"<field name="missing" position="replace"/>"#);
    assert!(matches!(err, ApplyError::TargetNotFound { .. }));
}

#[test]
fn move_spec_with_children_is_fatal() {
    let err = rewrite_err(
        r#"<form><a/><b/></form>"#,
        r#"<xpath expr="//b" position="inside"><a position="move"><junk/></a></xpath>"#,
    );
    assert!(matches!(err, ApplyError::MoveSpecHasChildren { .. }));
}

#[test]
fn bad_attributes_payload_is_fatal() {
    let err = rewrite_err(
        r#"<form><field name="a"/></form>"#,
        r#"<field name="a" position="attributes"><div/></field>"#,
    );
    assert!(matches!(err, ApplyError::BadAttributePayload { .. }));
}

#[test]
fn invalid_xpath_is_fatal_and_carries_the_expression() {
    let err = rewrite_err(r#"<form/>"#, r#"<xpath expr="//a[@b=" position="inside"/>"#);
    match err {
        ApplyError::XPathSyntax { expr, .. } => assert_eq!(expr, "//a[@b="),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn moving_a_node_into_its_own_subtree_is_not_found() {
    let err = rewrite_err(
        r#"<form><group name="g"><dest/></group></form>"#,
        r#"<xpath expr="//dest" position="inside"><group name="g" position="move"/></xpath>"#,
    );
    assert!(matches!(err, ApplyError::TargetNotFound { .. }));
}

#[test]
fn spec_text_is_inserted_around_the_anchor() {
    // after: spec text extends the anchor's tail, payload follows.
    assert_eq!(
        rewrite(
            "<form><a/>old<b/></form>",
            r#"<xpath expr="//a" position="after">new<c/></xpath>"#,
        ),
        "<form><a/>oldnew<c/><b/></form>"
    );
    // inside: spec text lands after the existing children.
    assert_eq!(
        rewrite(
            "<form>head<a/></form>",
            r#"<xpath expr="/form" position="inside">extra<b/></xpath>"#,
        ),
        "<form>head<a/>extra<b/></form>"
    );
}

#[test]
fn data_patch_with_mixed_directives() {
    assert_eq!(
        rewrite(
            r#"<form><group name="g"><field name="a"/><field name="b"/></group></form>"#,
            r#"<data><field name="b" position="replace"/><field name="a" position="attributes"><attribute name="readonly">1</attribute></field><xpath expr="//group" position="after"><footer/></xpath></data>"#,
        ),
        r#"<form><group name="g"><field name="a" readonly="1"/></group><footer/></form>"#
    );
}
