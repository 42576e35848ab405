/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use core::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::value::Value;

/// One named field slot of a dynamic object instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjField {
    /// Wire id; `0` until assigned by the writer or the decoder.
    pub id: i32,
    /// Field name; absent when decoded from a frame whose type has no local
    /// descriptor and no published metadata.
    pub name: Option<String>,
    pub value: Value,
}

/// A dynamic user-type instance: type identity plus named field slots in
/// write order, and optionally a raw tail carried opaquely through decode
/// and re-encode.
///
/// Instances are usually handled through [`ObjRef`], whose `Rc` identity is
/// what the writer's handle table and the cycle-reproduction guarantees are
/// built on.
#[derive(Debug, Clone, Default)]
pub struct ObjInst {
    type_id: i32,
    type_name: Option<String>,
    fields: Vec<ObjField>,
    raw: Option<Vec<u8>>,
}

impl ObjInst {
    /// Starts a new instance of the named type. The wire id is derived at
    /// write time from the context's mapper.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_id: 0,
            type_name: Some(type_name.into()),
            fields: Vec::new(),
            raw: None,
        }
    }

    /// Instance with a known wire id, as produced by the decoder.
    pub fn with_type_id(type_id: i32, type_name: Option<String>) -> Self {
        Self {
            type_id,
            type_name,
            fields: Vec::new(),
            raw: None,
        }
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub(crate) fn set_type_id(&mut self, type_id: i32) {
        self.type_id = type_id;
    }

    pub(crate) fn set_type_name(&mut self, type_name: Option<String>) {
        if type_name.is_some() {
            self.type_name = type_name;
        }
    }

    pub fn fields(&self) -> &[ObjField] {
        &self.fields
    }

    /// Sets a field, replacing an existing slot with the same name or
    /// appending a new one. Returns `self` for builder-style chaining.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(name, value);
        self
    }

    /// Sets a field in place.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .fields
            .iter_mut()
            .find(|f| f.name.as_deref() == Some(name.as_str()))
        {
            slot.value = value;
        } else {
            self.fields.push(ObjField {
                id: 0,
                name: Some(name),
                value,
            });
        }
    }

    pub(crate) fn push_field(&mut self, field: ObjField) {
        self.fields.push(field);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .map(|f| &f.value)
    }

    pub fn get_by_id(&self, id: i32) -> Option<&Value> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.value)
    }

    /// Raw tail bytes, present when the type uses an external serializer or
    /// when a frame with a raw tail was decoded without one.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    pub fn set_raw(&mut self, raw: Vec<u8>) {
        self.raw = Some(raw);
    }

    /// Wraps the instance into a shareable reference.
    pub fn into_ref(self) -> ObjRef {
        ObjRef::new(self)
    }
}

// Deep field-wise equality. Field ids are derived metadata (filled in by
// the writer and the decoder) and do not participate; callers comparing
// cyclic graphs should use ObjRef::ptr_eq instead.
impl PartialEq for ObjInst {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.raw == other.raw
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.name == b.name && a.value == b.value)
    }
}

/// Shared handle to an [`ObjInst`].
///
/// `Rc` identity is the observable object identity: the writer emits a
/// handle instead of a second encoding when it sees the same `ObjRef` twice,
/// and the decoder reproduces the sharing so that [`ObjRef::ptr_eq`] holds
/// on the decoded graph.
#[derive(Debug, Clone)]
pub struct ObjRef(Rc<RefCell<ObjInst>>);

impl ObjRef {
    pub fn new(inst: ObjInst) -> Self {
        Self(Rc::new(RefCell::new(inst)))
    }

    pub fn borrow(&self) -> Ref<'_, ObjInst> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ObjInst> {
        self.0.borrow_mut()
    }

    /// Identity comparison: do both handles point at the same instance?
    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable address used as the writer-side handle-table key.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }

    /// Clones the named field's value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.borrow().get(name).cloned()
    }
}

// Structural equality; diverges on cyclic graphs, like any deep compare.
impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.borrow() == *other.borrow()
    }
}

impl From<ObjInst> for ObjRef {
    fn from(inst: ObjInst) -> Self {
        ObjRef::new(inst)
    }
}
