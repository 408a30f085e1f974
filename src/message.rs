use tracing::{debug, trace};

use crate::field::FieldRead;
use crate::protocol::{field_id, TInputProtocol, TOutputProtocol, TStructIdentifier, WireType};
use crate::{Field, Result, ResultExt, TStruct, TType, Value};

/// A dynamically shaped Thrift struct: an ordered list of [`Field`]s.
///
/// Fields are written in the order they were added. Reading rebuilds the field list from the
/// wire, reusing its allocation.
///
/// Two messages are equal when their fields that hold a value agree in order, id, type and
/// value. Struct and field names, requiredness and empty fields are not compared, since a
/// decoded message cannot recover them.
#[derive(Debug, Clone, Default)]
pub struct Message {
    name: String,
    fields: Vec<Field>,
    allow_duplicate_ids: bool,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Message {
            name: name.into(),
            fields: Vec::new(),
            allow_duplicate_ids: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends a field. Ids are not checked for uniqueness.
    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// First field with the given id.
    pub fn field(&self, id: i16) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id)
    }

    pub fn field_mut(&mut self, id: i16) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id() == id)
    }

    /// Value of the first field with the given id.
    pub fn value(&self, id: i16) -> Option<&Value> {
        self.field(id).and_then(Field::value)
    }

    /// Removes and returns the first field with the given id.
    pub fn remove(&mut self, id: i16) -> Option<Field> {
        let index = self.fields.iter().position(|f| f.id() == id)?;
        Some(self.fields.remove(index))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Controls how repeated field ids are handled on read.
    ///
    /// By default a later field replaces the earlier one in place. When allowed, every occurrence
    /// is kept in wire order.
    pub fn allow_duplicate_ids(&mut self, allow: bool) -> &mut Self {
        self.allow_duplicate_ids = allow;
        self
    }

    pub fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        p.write_struct_begin(&TStructIdentifier::new(self.name.as_str()))
            .context(|| format!("{} write struct begin error", self.name))?;
        for field in &self.fields {
            field.write(p).context(|| {
                format!(
                    "{} write field {} '{}' ({}) error",
                    self.name,
                    field.id(),
                    field.name(),
                    field.field_type()
                )
            })?;
        }
        p.write_field_stop()
            .context(|| format!("{} write field stop error", self.name))?;
        p.write_struct_end()
            .context(|| format!("{} write struct end error", self.name))
    }

    /// Replaces the fields with those read from the protocol.
    ///
    /// Fields are stamped with the wire id, type and name, and are optional since the wire
    /// carries no requiredness. Fields of unmodeled types are skipped and left out.
    pub fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()> {
        self.fields.clear();
        p.read_struct_begin()
            .context(|| format!("{} read struct begin error", self.name))?;
        loop {
            let ident = p
                .read_field_begin()
                .context(|| format!("{} read field begin error", self.name))?;
            let wire_type = ident.field_type;
            if wire_type == WireType::Stop {
                break;
            }
            let id = field_id(&ident).context(|| format!("{} read field begin error", self.name))?;
            let mut decoded = None;
            let outcome = match TType::try_from(wire_type) {
                Ok(field_type) => {
                    let mut field = Field::optional(id, field_type, ident.name.unwrap_or_default());
                    let outcome = field.read(p).context(|| {
                        format!(
                            "{} read field {} '{}' ({}) error",
                            self.name,
                            id,
                            field.name(),
                            field_type
                        )
                    })?;
                    decoded = Some(field);
                    outcome
                }
                Err(_) => FieldRead::Unsupported,
            };
            if outcome == FieldRead::Unsupported {
                trace!(name = %self.name, id, ?wire_type, "skipping field of unmodeled type");
                p.skip(wire_type).context(|| {
                    format!("{} field {} skip type {:?} error", self.name, id, wire_type)
                })?;
            }
            p.read_field_end()
                .context(|| format!("{} read field end error", self.name))?;
            if let (FieldRead::Decoded, Some(field)) = (outcome, decoded) {
                self.insert_read_field(field);
            }
        }
        p.read_struct_end()
            .context(|| format!("{} read struct end error", self.name))
    }

    fn insert_read_field(&mut self, field: Field) {
        if !self.allow_duplicate_ids {
            if let Some(existing) = self.fields.iter_mut().find(|f| f.id() == field.id()) {
                debug!(name = %self.name, id = field.id(), "duplicate field id replaces earlier value");
                *existing = field;
                return;
            }
        }
        self.fields.push(field);
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        fn present(message: &Message) -> impl Iterator<Item = (i16, TType, &Value)> {
            message
                .fields
                .iter()
                .filter_map(|f| f.value().map(|v| (f.id(), f.field_type(), v)))
        }
        present(self).eq(present(other))
    }
}

impl TStruct for Message {
    fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        Message::write(self, p)
    }

    fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()> {
        Message::read(self, p)
    }
}
