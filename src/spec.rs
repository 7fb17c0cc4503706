use std::{
    any::{type_name, TypeId},
    cell::RefCell,
    collections::{BTreeMap, HashSet},
    fmt,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::dims::Dims;
use crate::dtype::{Dtype, DtypeSpec};
use crate::errors::{Error, Result};
use crate::factory::{DefaultFactory, Factory};
use crate::values::{Record, Value};

/// The purpose a declared field serves when building a labeled array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The array payload, or one member of a dataset.
    Data,
    /// A coordinate array attached to the result.
    Coord,
    /// Opaque metadata, stored unchanged.
    Attr,
    /// The display name of the result.
    Name,
}

/// The normalized description of one declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Name the field's value is bound under.
    pub name: String,

    pub role: Role,

    /// Dimensions of the array the value is coerced to. Only meaningful for
    /// data and coordinate fields.
    pub dims: Dims,

    /// Element type the value is cast to, or ``None`` for no coercion.
    pub dtype: Option<Dtype>,

    /// Value used when a record does not bind this field.
    pub default: Option<Value>,

    /// Key the resolved entry is stored under, when it differs from the
    /// field name. Set by composition references that declare a name.
    pub alias: Option<String>,

    /// Referenced class for composed ("-of") fields.
    pub nested: Option<Arc<Spec>>,
}

impl FieldSpec {
    /// The key the resolved entry is stored under.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The cached, immutable description of all of a class's declared fields.
///
/// Built once per class on first use and shared by every instance after
/// that. Rebuilding the same class's table yields an equal table, so a race
/// between two first users costs redundant work, nothing else.
pub struct Spec {
    /// Short display name of the class, used in error messages.
    pub class: String,

    /// Field specs in declaration order.
    pub fields: Vec<FieldSpec>,

    pub(crate) factory: Arc<dyn Factory>,
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Spec")
            .field("class", &self.class)
            .field("fields", &self.fields)
            .finish()
    }
}

impl PartialEq for Spec {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.fields == other.fields
    }
}

static REGISTRY: Mutex<BTreeMap<TypeId, Arc<Spec>>> = Mutex::new(BTreeMap::new());

thread_local! {
    static RESOLVING: RefCell<Vec<TypeId>> = RefCell::new(Vec::new());
}

impl Spec {
    /// The table for a class, computed on first use and cached after.
    pub fn of<T: Declare>() -> Result<Arc<Spec>> {
        let key = TypeId::of::<T>();
        if let Some(spec) = REGISTRY.lock().get(&key) {
            return Ok(Arc::clone(spec));
        }

        // A class reached again while its own table is still being computed
        // can only mean a composition loop.
        let in_progress = RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                true
            } else {
                stack.push(key);
                false
            }
        });
        if in_progress {
            return Err(Error::CyclicComposition {
                class: class_name::<T>(),
            });
        }

        let result = T::declare(SpecBuilder::new(class_name::<T>())).finish();
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });

        let spec = Arc::new(result?);
        let mut registry = REGISTRY.lock();
        let entry = registry.entry(key).or_insert(spec);
        Ok(Arc::clone(entry))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn data_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.role == Role::Data)
    }

    pub fn coord_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.role == Role::Coord)
    }

    pub fn attr_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.role == Role::Attr)
    }

    pub fn name_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.role == Role::Name)
    }

    /// The payload entry for single-array use.
    ///
    /// The first declared data field is the payload; additional data fields
    /// are accepted but ignored here.
    pub fn primary_data(&self) -> Result<&FieldSpec> {
        self.data_fields().next().ok_or_else(|| Error::NoDataField {
            class: self.class.clone(),
        })
    }
}

fn class_name<T>() -> String {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name).to_string()
}

/// A class that maps its fields onto a labeled array.
///
/// ``declare`` lists the role-tagged field descriptors in declaration order;
/// ``bind`` hands over an instance's raw field values under the same names.
pub trait Declare: Sized + 'static {
    fn declare(spec: SpecBuilder) -> SpecBuilder;

    fn bind(self) -> Record;

    /// Bind as a value for a composed field of another class.
    fn into_value(self) -> Value {
        Value::Record(self.bind())
    }
}

/// Collects field declarations for one class.
///
/// Errors are deferred: the first one wins and surfaces when the table is
/// finished, so declarations can chain freely.
pub struct SpecBuilder {
    class: String,
    fields: Vec<FieldSpec>,
    inherited: HashSet<String>,
    factory: Arc<dyn Factory>,
    error: Option<Error>,
}

impl SpecBuilder {
    pub(crate) fn new(class: String) -> Self {
        Self {
            class,
            fields: Vec::new(),
            inherited: HashSet::new(),
            factory: Arc::new(DefaultFactory),
            error: None,
        }
    }

    /// Import another class's fields, to be refined by later declarations.
    ///
    /// A redeclared field replaces the imported one in place, keeping its
    /// position. The imported class's factory carries over until overridden.
    pub fn extend<P: Declare>(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        match Spec::of::<P>() {
            Ok(parent) => {
                for field in &parent.fields {
                    if let Some(index) = self.fields.iter().position(|f| f.name == field.name) {
                        self.fields[index] = field.clone();
                    } else {
                        self.inherited.insert(field.name.clone());
                        self.fields.push(field.clone());
                    }
                }
                self.factory = Arc::clone(&parent.factory);
            }
            Err(error) => self.error = Some(error),
        }
        self
    }

    /// Declare the array payload (or one dataset member).
    pub fn data(
        self,
        name: impl Into<String>,
        dims: impl Into<Dims>,
        dtype: impl Into<DtypeSpec>,
    ) -> Self {
        let field = FieldSpec {
            name: name.into(),
            role: Role::Data,
            dims: dims.into(),
            dtype: dtype.into().resolve(),
            default: None,
            alias: None,
            nested: None,
        };
        self.push(field)
    }

    /// Declare a coordinate.
    pub fn coord(
        self,
        name: impl Into<String>,
        dims: impl Into<Dims>,
        dtype: impl Into<DtypeSpec>,
    ) -> Self {
        let field = FieldSpec {
            name: name.into(),
            role: Role::Coord,
            dims: dims.into(),
            dtype: dtype.into().resolve(),
            default: None,
            alias: None,
            nested: None,
        };
        self.push(field)
    }

    /// Declare a coordinate whose dims and dtype come from another class.
    pub fn coord_of<C: Declare>(self, name: impl Into<String>) -> Self {
        self.composed::<C>(name.into(), Role::Coord)
    }

    /// Declare a data member whose dims and dtype come from another class.
    pub fn data_of<C: Declare>(self, name: impl Into<String>) -> Self {
        self.composed::<C>(name.into(), Role::Data)
    }

    /// Declare an attribute. The value passes through unchanged.
    pub fn attr(self, name: impl Into<String>) -> Self {
        let field = FieldSpec {
            name: name.into(),
            role: Role::Attr,
            dims: Dims::scalar(),
            dtype: None,
            default: None,
            alias: None,
            nested: None,
        };
        self.push(field)
    }

    /// Declare the field holding the result's display name.
    pub fn name(self, name: impl Into<String>) -> Self {
        let field = FieldSpec {
            name: name.into(),
            role: Role::Name,
            dims: Dims::scalar(),
            dtype: None,
            default: None,
            alias: None,
            nested: None,
        };
        self.push(field)
    }

    /// Attach a default to an already declared field.
    pub fn default(mut self, name: &str, value: impl Into<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.default = Some(value.into()),
            None => {
                self.error = Some(Error::UnsupportedField {
                    class: self.class.clone(),
                    field: name.to_string(),
                })
            }
        }
        self
    }

    /// Replace the factory the final container is assembled with, for this
    /// class only.
    pub fn factory(mut self, factory: Arc<dyn Factory>) -> Self {
        self.factory = factory;
        self
    }

    fn composed<C: Declare>(mut self, name: String, role: Role) -> Self {
        if self.error.is_some() {
            return self;
        }
        let nested = match Spec::of::<C>() {
            Ok(nested) => nested,
            Err(error) => {
                self.error = Some(error);
                return self;
            }
        };
        let data = match nested.data_fields().next() {
            Some(data) => data,
            None => {
                self.error = Some(Error::MissingDataField {
                    class: nested.class.clone(),
                });
                return self;
            }
        };
        let alias = nested.name_fields().next().and_then(|field| match &field.default {
            Some(Value::Scalar(scalar)) => Some(scalar.to_text()),
            _ => None,
        });
        let field = FieldSpec {
            name,
            role,
            dims: data.dims.clone(),
            dtype: data.dtype,
            default: None,
            alias,
            nested: Some(Arc::clone(&nested)),
        };
        self.push(field)
    }

    fn push(mut self, field: FieldSpec) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Some(index) = self.fields.iter().position(|f| f.name == field.name) {
            if self.inherited.remove(&field.name) {
                self.fields[index] = field;
            } else {
                self.error = Some(Error::UnsupportedField {
                    class: self.class.clone(),
                    field: field.name,
                });
            }
        } else {
            self.fields.push(field);
        }
        self
    }

    fn finish(self) -> Result<Spec> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Spec {
            class: self.class,
            fields: self.fields,
            factory: self.factory,
        })
    }
}
