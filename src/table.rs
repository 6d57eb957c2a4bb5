//! Ordered field registration table
//!
//! Registration order is stable across mutation and is the iteration order
//! everywhere: model aggregation, validation, and notifications all walk the
//! table front to back. Name lookups resolve to the last-registered match, on
//! read and write paths alike.

use crate::field::{FieldId, FieldRecord};

#[derive(Debug, Default)]
pub struct FieldTable {
	records: Vec<FieldRecord>,
}

impl FieldTable {
	pub fn new() -> Self {
		Self {
			records: Vec::new(),
		}
	}

	/// Append a record. Duplicate names are legal (radio groups); they never
	/// error.
	pub fn register(&mut self, record: FieldRecord) {
		tracing::debug!(id = %record.id(), name = %record.name(), "field registered");
		self.records.push(record);
	}

	/// Remove a record permanently.
	pub fn unregister(&mut self, id: FieldId) -> Option<FieldRecord> {
		let pos = self.records.iter().position(|r| r.id() == id)?;
		let record = self.records.remove(pos);
		tracing::debug!(id = %id, name = %record.name(), "field unregistered");
		Some(record)
	}

	pub fn get(&self, id: FieldId) -> Option<&FieldRecord> {
		self.records.iter().find(|r| r.id() == id)
	}

	pub fn get_mut(&mut self, id: FieldId) -> Option<&mut FieldRecord> {
		self.records.iter_mut().find(|r| r.id() == id)
	}

	/// Last-registered record with the given name.
	pub fn find_by_name(&self, name: &str) -> Option<&FieldRecord> {
		self.records.iter().rev().find(|r| r.name() == name)
	}

	/// Ids of every record sharing the given name, in registration order.
	pub fn ids_by_name(&self, name: &str) -> Vec<FieldId> {
		self.records
			.iter()
			.filter(|r| r.name() == name)
			.map(|r| r.id())
			.collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = &FieldRecord> {
		self.records.iter()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FieldRecord> {
		self.records.iter_mut()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
