use crate::core::{read_value, write_value};
use crate::protocol::{field_id, TFieldIdentifier, TInputProtocol, TOutputProtocol, WireType};
use crate::{Result, TStruct, TType, ThriftError, Value};

/// Outcome of [`Field::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRead {
    /// The value was decoded and stored.
    Decoded,
    /// The wire type is not a modeled kind. Nothing was consumed; the caller should skip the
    /// encoded value.
    Unsupported,
}

/// One identified, typed slot of a [`Message`](crate::Message).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    id: i16,
    field_type: TType,
    name: String,
    required: bool,
    value: Option<Value>,
}

impl Field {
    pub fn new(id: i16, field_type: TType, name: impl Into<String>, required: bool) -> Self {
        Field {
            id,
            field_type,
            name: name.into(),
            required,
            value: None,
        }
    }

    /// A field that is always written, falling back to the zero value of its type.
    pub fn required(id: i16, field_type: TType, name: impl Into<String>) -> Self {
        Self::new(id, field_type, name, true)
    }

    /// A field that is omitted from the wire while it has no value.
    pub fn optional(id: i16, field_type: TType, name: impl Into<String>) -> Self {
        Self::new(id, field_type, name, false)
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    pub fn clear_value(&mut self) -> &mut Self {
        self.value = None;
        self
    }

    pub fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut Value> {
        self.value.as_mut()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    pub fn id(&self) -> i16 {
        self.id
    }

    pub fn field_type(&self) -> TType {
        self.field_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) -> &mut Self {
        self.required = required;
        self
    }

    /// Writes the field envelope and its value.
    ///
    /// The declared type decides how the value is written:
    /// - a value of the matching kind is written as is;
    /// - an optional field with no value, or with a value of another kind, writes nothing;
    /// - no value on a required scalar field writes the zero value of the type;
    /// - no value on a required struct or container field fails with `MissingRequired`;
    /// - a value of another kind on a required field fails with `TypeMismatch`.
    ///
    /// A declared `Stop` or `Void` always fails with `UnsupportedType`.
    pub fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        if !self.field_type.is_element() {
            return Err(ThriftError::UnsupportedType(self.field_type.into()));
        }
        let zero;
        let value = match &self.value {
            Some(value) if value.matches(self.field_type) => value,
            Some(_) if !self.required => return Ok(()),
            Some(value) => {
                return Err(ThriftError::TypeMismatch {
                    expected: self.field_type,
                    actual: value.kind_name(),
                })
            }
            None if !self.required => return Ok(()),
            None => {
                zero = Value::zero(self.field_type).ok_or_else(|| ThriftError::MissingRequired {
                    id: self.id,
                    name: self.name.clone(),
                })?;
                &zero
            }
        };
        p.write_field_begin(&TFieldIdentifier::new(
            self.name.as_str(),
            WireType::from(self.field_type),
            self.id,
        ))?;
        write_value(p, self.field_type, value)?;
        Ok(p.write_field_end()?)
    }

    /// Reads the field value according to the declared type, replacing any previous value.
    pub fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<FieldRead> {
        if self.field_type == TType::Void {
            self.value = None;
            return Ok(FieldRead::Decoded);
        }
        match read_value(p, self.field_type)? {
            Some(value) => {
                self.value = Some(value);
                Ok(FieldRead::Decoded)
            }
            None => Ok(FieldRead::Unsupported),
        }
    }
}

/// A lone field, written and read with its field envelope but without a struct envelope.
///
/// Reading takes the id, type and name from the wire.
impl TStruct for Field {
    fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        Field::write(self, p)
    }

    fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()> {
        self.value = None;
        let ident = p.read_field_begin()?;
        if ident.field_type == WireType::Stop {
            return Ok(());
        }
        self.id = field_id(&ident)?;
        if let Some(name) = ident.name {
            self.name = name;
        }
        let outcome = match TType::try_from(ident.field_type) {
            Ok(field_type) => {
                self.field_type = field_type;
                Field::read(self, p)?
            }
            Err(_) => FieldRead::Unsupported,
        };
        if outcome == FieldRead::Unsupported {
            p.skip(ident.field_type)?;
        }
        Ok(p.read_field_end()?)
    }
}
