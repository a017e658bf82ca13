use thiserror::Error;

/// Fatal failures while applying inheritance specs. The engine never
/// recovers locally: the base tree is left partially rewritten and the
/// caller is expected to discard it. Each variant embeds the serialized
/// offending spec so operators can find the failing patch.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("invalid XPath expression {expr:?}: {message}")]
    XPathSyntax { expr: String, message: String },

    #[error("element cannot be located in the source view: {spec}")]
    TargetNotFound { spec: String },

    #[error("moved element cannot be located in the source view: {spec}")]
    MoveTargetNotFound { spec: String },

    #[error("invalid position {position:?} on element: {spec}")]
    UnknownPosition { position: String, spec: String },

    #[error("invalid specification for a moved element, it must have no children: {spec}")]
    MoveSpecHasChildren { spec: String },

    #[error("attributes directive only accepts <attribute name=\"...\"> children: {spec}")]
    BadAttributePayload { spec: String },

    #[error("attribute element mixes a text value with add/remove lists: {spec}")]
    MixedAttributeValue { spec: String },

    #[error("replacement payload contains no element to graft as the new root: {spec}")]
    EmptyReplacement { spec: String },

    #[error("malformed inheritance spec, {message}: {spec}")]
    MalformedSpec { spec: String, message: String },
}
