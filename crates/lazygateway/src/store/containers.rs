use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

/// ContainerRecord is the gateway's view of one container on the runtime.
/// `id` is the runtime-assigned identifier and never changes for a record;
/// `last_access` only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
	pub id: String,
	pub name: String,
	pub is_active: bool,
	pub last_access: Instant,
}

impl ContainerRecord {
	pub fn new(id: String, name: String, is_active: bool) -> ContainerRecord {
		ContainerRecord {
			id,
			name,
			is_active,
			last_access: Instant::now(),
		}
	}
}

/// ContainerStore indexes the containers known to the gateway by id. It is
/// the single source of truth for the gateway's view of the runtime; all
/// operations are linearizable and readers receive value copies.
#[derive(Debug, Default)]
pub struct ContainerStore {
	by_id: RwLock<HashMap<String, ContainerRecord>>,
}

impl ContainerStore {
	/// insert adds a record, replacing any prior record with the same id.
	pub fn insert(&self, record: ContainerRecord) {
		self
			.by_id
			.write()
			.unwrap()
			.insert(record.id.clone(), record);
	}

	/// update replaces an existing record by id; unknown ids are ignored.
	pub fn update(&self, record: ContainerRecord) {
		let mut by_id = self.by_id.write().unwrap();
		if let Some(existing) = by_id.get_mut(&record.id) {
			*existing = record;
		}
	}

	pub fn remove(&self, id: &str) -> Option<ContainerRecord> {
		self.by_id.write().unwrap().remove(id)
	}

	pub fn get_by_id(&self, id: &str) -> Option<ContainerRecord> {
		self.by_id.read().unwrap().get(id).cloned()
	}

	/// get_by_name returns a record with the given service name, preferring
	/// an active one when the runtime briefly reports duplicates.
	pub fn get_by_name(&self, name: &str) -> Option<ContainerRecord> {
		let by_id = self.by_id.read().unwrap();
		let mut found = None;
		for record in by_id.values().filter(|r| r.name == name) {
			if record.is_active {
				return Some(record.clone());
			}
			found = Some(record.clone());
		}
		found
	}

	/// touch advances last_access to now. It never moves the timestamp
	/// backwards, so concurrent touches are idempotent.
	pub fn touch(&self, id: &str) {
		let now = Instant::now();
		if let Some(record) = self.by_id.write().unwrap().get_mut(id) {
			record.last_access = record.last_access.max(now);
		}
	}

	/// set_active flips the running flag, preserving the rest of the record.
	pub fn set_active(&self, id: &str, active: bool) {
		if let Some(record) = self.by_id.write().unwrap().get_mut(id) {
			record.is_active = active;
		}
	}

	pub fn snapshot(&self) -> HashMap<String, ContainerRecord> {
		self.by_id.read().unwrap().clone()
	}
}
