//! Aggregate values and storage locations.
//!
//! Slices, arrays and structs keep their elements in shared [`Cells`]. A
//! slice shares its backing cells with every slice derived from it; arrays
//! and structs are copied when stored (see [`Value::copied`]). A [`Place`]
//! is an addressable location: a variable slot or one cell of an aggregate.

use super::Value;
use crate::errors::{slice_bounds, type_mismatch, EvalError};
use crate::types::{IntKind, Type};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Shared element storage.
pub type Cells = Arc<RwLock<Vec<Value>>>;

pub fn new_cells(values: Vec<Value>) -> Cells {
    Arc::new(RwLock::new(values))
}

/// A variable's storage.
#[derive(Debug)]
pub struct Slot(RwLock<Value>);

impl Slot {
    pub fn new(value: Value) -> Arc<Slot> {
        Arc::new(Slot(RwLock::new(value)))
    }

    #[inline]
    pub fn get(&self) -> Value {
        self.0.read().clone()
    }

    #[inline]
    pub fn set(&self, value: Value) {
        *self.0.write() = value;
    }
}

/// An addressable location.
#[derive(Clone)]
pub enum Place {
    Slot(Arc<Slot>),
    Cell(Cells, usize),
}

impl Place {
    pub fn load(&self) -> Value {
        match self {
            Place::Slot(slot) => slot.get(),
            Place::Cell(cells, i) => cells.read().get(*i).cloned().unwrap_or(Value::None),
        }
    }

    pub fn store(&self, value: Value) {
        match self {
            Place::Slot(slot) => slot.set(value),
            Place::Cell(cells, i) => {
                if let Some(cell) = cells.write().get_mut(*i) {
                    *cell = value;
                }
            }
        }
    }

    /// Identity of the location, used for pointer equality and printing.
    pub fn address(&self) -> usize {
        match self {
            Place::Slot(slot) => Arc::as_ptr(slot) as usize,
            Place::Cell(cells, i) => {
                Arc::as_ptr(cells) as usize + i * std::mem::size_of::<Value>()
            }
        }
    }
}

/// A slice: a window onto shared backing cells.
#[derive(Clone)]
pub struct SliceValue {
    pub elem: Type,
    data: Option<Cells>,
    offset: usize,
    len: usize,
    cap: usize,
}

impl SliceValue {
    pub fn nil(elem: Type) -> Self {
        SliceValue {
            elem,
            data: None,
            offset: 0,
            len: 0,
            cap: 0,
        }
    }

    pub fn from_vec(elem: Type, values: Vec<Value>) -> Self {
        let len = values.len();
        SliceValue {
            elem,
            data: Some(new_cells(values)),
            offset: 0,
            len,
            cap: len,
        }
    }

    /// `make([]T, len, cap)`
    pub fn with_len(elem: Type, len: usize, cap: usize, zero: &Value) -> Self {
        let values = (0..cap).map(|_| zero.copied()).collect();
        SliceValue {
            elem,
            data: Some(new_cells(values)),
            offset: 0,
            len,
            cap,
        }
    }

    /// A slice over an array's cells, `cells[low..high]` with capacity up to `max`.
    pub fn over(elem: Type, cells: Cells, low: usize, high: usize, max: usize) -> Self {
        SliceValue {
            elem,
            data: Some(cells),
            offset: low,
            len: high - low,
            cap: max - low,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        if i >= self.len {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.read().get(self.offset + i).cloned())
    }

    pub fn place(&self, i: usize) -> Option<Place> {
        if i >= self.len {
            return None;
        }
        self.data
            .as_ref()
            .map(|d| Place::Cell(d.clone(), self.offset + i))
    }

    pub fn to_vec(&self) -> Vec<Value> {
        match &self.data {
            Some(d) => d.read()[self.offset..self.offset + self.len].to_vec(),
            None => Vec::new(),
        }
    }

    /// `s[low:high:max]` with missing bounds already defaulted.
    pub fn reslice(&self, low: usize, high: usize, max: usize) -> Result<SliceValue, EvalError> {
        if low > high || high > max || max > self.cap {
            return Err(slice_bounds(low, high, self.cap));
        }
        Ok(SliceValue {
            elem: self.elem.clone(),
            data: self.data.clone(),
            offset: self.offset + low,
            len: high - low,
            cap: max - low,
        })
    }

    /// `append(s, items...)`: writes in place while capacity allows,
    /// otherwise copies into a larger backing array.
    #[must_use]
    pub fn append(&self, items: Vec<Value>) -> SliceValue {
        if items.is_empty() {
            return self.clone();
        }
        let new_len = self.len + items.len();
        if let Some(data) = &self.data {
            if new_len <= self.cap {
                let mut cells = data.write();
                for (i, item) in items.into_iter().enumerate() {
                    cells[self.offset + self.len + i] = item;
                }
                return SliceValue {
                    len: new_len,
                    ..self.clone()
                };
            }
        }
        let new_cap = new_len.max(self.cap * 2);
        let mut values = self.to_vec();
        values.extend(items);
        let zero = Value::zero(&self.elem);
        values.resize_with(new_cap, || zero.copied());
        SliceValue {
            elem: self.elem.clone(),
            data: Some(new_cells(values)),
            offset: 0,
            len: new_len,
            cap: new_cap,
        }
    }

    /// `copy(dst, src)`: number of elements copied.
    pub fn copy_from(&self, src: &[Value]) -> usize {
        let n = self.len.min(src.len());
        if let Some(data) = &self.data {
            let mut cells = data.write();
            for (i, v) in src.iter().take(n).enumerate() {
                cells[self.offset + i] = v.copied();
            }
        }
        n
    }
}

/// A fixed-length array.
#[derive(Clone)]
pub struct ArrayValue {
    pub elem: Type,
    pub cells: Cells,
}

impl ArrayValue {
    pub fn new(elem: Type, values: Vec<Value>) -> Self {
        ArrayValue {
            elem,
            cells: new_cells(values),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        self.cells.read().get(i).cloned()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.cells.read().clone()
    }
}

/// A struct instance. `ty` is the declared (possibly named) struct type.
#[derive(Clone)]
pub struct StructValue {
    pub ty: Type,
    pub fields: Cells,
}

impl StructValue {
    pub fn new(ty: Type, values: Vec<Value>) -> Self {
        StructValue {
            ty,
            fields: new_cells(values),
        }
    }

    pub fn field(&self, i: usize) -> Option<Value> {
        self.fields.read().get(i).cloned()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.fields.read().clone()
    }
}

/// Hashable image of a map key.
///
/// Keys carry enough of their dynamic type that `int(1)` and `int8(1)`
/// stay distinct in `map[interface{}]V`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum MapKey {
    Nil,
    Bool(bool),
    Int(i128, IntKind),
    Float(u64),
    Complex(u64, u64),
    Str(Arc<str>),
    Addr(usize),
    Composite(Vec<MapKey>),
}

/// Order-preserving bit image of a float; `-0.0` and `0.0` coincide.
fn float_key(v: f64) -> u64 {
    let v = if v == 0.0 { 0.0 } else { v };
    let bits = v.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

impl MapKey {
    pub fn from_value(value: &Value) -> Result<MapKey, EvalError> {
        Ok(match value {
            Value::Nil => MapKey::Nil,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Int(i) => MapKey::Int(i.get(), i.kind()),
            Value::Float(f) => MapKey::Float(float_key(f.get())),
            Value::Complex(c) => MapKey::Complex(float_key(c.re()), float_key(c.im())),
            Value::Str(s) => MapKey::Str(s.clone()),
            Value::Pointer(p) => MapKey::Addr(p.target.as_ref().map_or(0, Place::address)),
            Value::Chan(c) => MapKey::Addr(c.id()),
            Value::Array(a) => MapKey::Composite(
                a.to_vec().iter().map(MapKey::from_value).collect::<Result<_, _>>()?,
            ),
            Value::Struct(s) => MapKey::Composite(
                s.to_vec().iter().map(MapKey::from_value).collect::<Result<_, _>>()?,
            ),
            Value::Untyped(c) => return MapKey::from_value(&c.default_value()?),
            other => {
                return Err(type_mismatch(format!(
                    "runtime error: hash of unhashable type {}",
                    other.type_of()
                )))
            }
        })
    }
}

pub type MapData = FxHashMap<MapKey, (Value, Value)>;

/// A map. The zero map is `nil`: readable, not writable.
#[derive(Clone)]
pub struct MapValue {
    pub key: Type,
    pub value: Type,
    data: Option<Arc<RwLock<MapData>>>,
}

impl MapValue {
    pub fn nil(key: Type, value: Type) -> Self {
        MapValue {
            key,
            value,
            data: None,
        }
    }

    pub fn new(key: Type, value: Type) -> Self {
        MapValue {
            key,
            value,
            data: Some(Arc::new(RwLock::new(FxHashMap::default()))),
        }
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.read().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, EvalError> {
        let k = MapKey::from_value(key)?;
        Ok(self
            .data
            .as_ref()
            .and_then(|d| d.read().get(&k).map(|(_, v)| v.clone())))
    }

    pub fn insert(&self, key: Value, value: Value) -> Result<(), EvalError> {
        let k = MapKey::from_value(&key)?;
        match &self.data {
            Some(d) => {
                d.write().insert(k, (key, value));
                Ok(())
            }
            None => Err(type_mismatch("assignment to entry in nil map")),
        }
    }

    pub fn remove(&self, key: &Value) -> Result<(), EvalError> {
        let k = MapKey::from_value(key)?;
        if let Some(d) = &self.data {
            d.write().remove(&k);
        }
        Ok(())
    }

    /// Entries ordered by key.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        let Some(d) = &self.data else {
            return Vec::new();
        };
        let guard = d.read();
        let mut entries: Vec<_> = guard.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, kv)| kv.clone()).collect()
    }

    pub fn identity(&self) -> usize {
        self.data.as_ref().map_or(0, |d| Arc::as_ptr(d) as usize)
    }
}

/// A pointer; `target` is `None` for a typed nil pointer.
#[derive(Clone)]
pub struct PointerValue {
    pub elem: Type,
    pub target: Option<Place>,
}

impl PointerValue {
    pub fn new(elem: Type, place: Place) -> Self {
        PointerValue {
            elem,
            target: Some(place),
        }
    }

    pub fn nil(elem: Type) -> Self {
        PointerValue { elem, target: None }
    }
}
