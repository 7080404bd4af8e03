//! Errors reported while resolving schemas and decoding parameters.

use alloc::string::String;
use core::error::Error;
use core::fmt;

use crate::builder::ConstructError;
use crate::cardinality::CardinalityError;
use crate::decl::WrongType;

/// Which rule a failing field was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// The field is required, or the failure is one that is always fatal.
    Required,
    /// The field is optional.
    Optional,
}

impl Rule {
    pub(crate) const fn for_field(required: bool) -> Self {
        if required {
            Rule::Required
        } else {
            Rule::Optional
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rule::Required => "required",
            Rule::Optional => "optional",
        })
    }
}

/// A value was not in the field's whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// The Rust field name.
    pub field: String,
    /// The parameter key.
    pub param: String,
    /// The rejected item.
    pub value: String,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input value {:?} is not supported", self.value)
    }
}

impl Error for ValueError {}

/// The underlying reason a field failed.
#[derive(Debug)]
pub enum Cause {
    /// The number or emptiness of the raw values was wrong.
    Cardinality(CardinalityError),
    /// A value was outside the whitelist.
    Value(ValueError),
    /// A value builder rejected its input.
    Construct(ConstructError),
    /// An assignment hook was handed a value it was not declared for.
    WrongType(WrongType),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Cardinality(err) => fmt::Display::fmt(err, f),
            Cause::Value(err) => fmt::Display::fmt(err, f),
            Cause::Construct(err) => fmt::Display::fmt(err, f),
            Cause::WrongType(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl Cause {
    fn as_error(&self) -> &(dyn Error + 'static) {
        match self {
            Cause::Cardinality(err) => err,
            Cause::Value(err) => err,
            Cause::Construct(err) => err,
            Cause::WrongType(err) => err,
        }
    }
}

/// One field failed validation.
#[derive(Debug)]
pub struct FieldError {
    /// The rule the field was checked against.
    pub rule: Rule,
    /// The Rust field name.
    pub field: String,
    /// The parameter key, or `None` when a composite field failed as a whole.
    pub param: Option<String>,
    /// What went wrong.
    pub cause: Cause,
}

impl FieldError {
    /// Whether the failure counts against a required field.
    pub fn is_required(&self) -> bool {
        self.rule == Rule::Required
    }

    /// The cardinality violation, if that is what failed.
    pub fn cardinality(&self) -> Option<CardinalityError> {
        match self.cause {
            Cause::Cardinality(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field failed validation. field: {}", self.rule, self.field)?;
        if let Some(param) = &self.param {
            write!(f, ", param: {param}")?;
        }
        Ok(())
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_error())
    }
}

/// A decode that stopped at the first failing field.
///
/// `partial` holds every field assigned before the failure; the failing
/// field and the ones after it are still at their `Default` value.
pub struct Rejected<T> {
    /// Why decoding stopped.
    pub error: FieldError,
    /// The target as built so far.
    pub partial: T,
}

impl<T> Rejected<T> {
    /// Split into the error and the partial target.
    pub fn into_parts(self) -> (FieldError, T) {
        (self.error, self.partial)
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

/// A target type could not be turned into a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectError {
    /// Name of the type whose schema failed.
    pub type_name: &'static str,
    /// What was wrong with it.
    pub kind: ReflectErrorKind,
}

/// Why schema resolution failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectErrorKind {
    /// A leaf field's type has no value builder and no way to make one.
    NoConstructor {
        /// The Rust field name.
        field: String,
        /// The leaf type.
        value_type: &'static str,
    },
    /// The `nested` mark on a field disagrees with its declared element.
    NestedMismatch {
        /// The Rust field name.
        field: String,
        /// Whether the field was marked nested.
        marked: bool,
    },
    /// A composite field was declared as a list.
    NestedList {
        /// The Rust field name.
        field: String,
    },
    /// The type contains itself through its composite fields.
    Recursive,
}

impl fmt::Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ReflectErrorKind::NoConstructor { field, value_type } => write!(
                f,
                "no value builder for {value_type} (field {field} of {})",
                self.type_name
            ),
            ReflectErrorKind::NestedMismatch { field, marked: true } => write!(
                f,
                "field {field} of {} is marked nested but holds a leaf value",
                self.type_name
            ),
            ReflectErrorKind::NestedMismatch {
                field,
                marked: false,
            } => write!(
                f,
                "field {field} of {} holds a composite value but is not marked nested",
                self.type_name
            ),
            ReflectErrorKind::NestedList { field } => write!(
                f,
                "field {field} of {} is a list of composite values",
                self.type_name
            ),
            ReflectErrorKind::Recursive => {
                write!(f, "{} contains itself through nested fields", self.type_name)
            }
        }
    }
}

impl Error for ReflectError {}

/// Everything [`Decoder::decode`](crate::Decoder::decode) can fail with.
pub enum DecodeError<T> {
    /// The target type has no usable schema.
    Schema(ReflectError),
    /// A field failed validation.
    Rejected(Rejected<T>),
}

impl<T> DecodeError<T> {
    /// The field failure, if decoding got that far.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            DecodeError::Rejected(rejected) => Some(&rejected.error),
            DecodeError::Schema(_) => None,
        }
    }

    /// The partial target, if decoding got that far.
    pub fn into_partial(self) -> Option<T> {
        match self {
            DecodeError::Rejected(rejected) => Some(rejected.partial),
            DecodeError::Schema(_) => None,
        }
    }
}

impl<T> From<ReflectError> for DecodeError<T> {
    fn from(err: ReflectError) -> Self {
        DecodeError::Schema(err)
    }
}

impl<T> From<Rejected<T>> for DecodeError<T> {
    fn from(rejected: Rejected<T>) -> Self {
        DecodeError::Rejected(rejected)
    }
}

impl<T> fmt::Debug for DecodeError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Schema(err) => f.debug_tuple("Schema").field(err).finish(),
            DecodeError::Rejected(rejected) => f.debug_tuple("Rejected").field(rejected).finish(),
        }
    }
}

impl<T> fmt::Display for DecodeError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Schema(err) => fmt::Display::fmt(err, f),
            DecodeError::Rejected(rejected) => fmt::Display::fmt(rejected, f),
        }
    }
}

impl<T> Error for DecodeError<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Schema(err) => Some(err),
            DecodeError::Rejected(rejected) => Some(&rejected.error),
        }
    }
}
