use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use super::domain::{
    Address, AddressId, DocumentId, PpmShipment, PpmShipmentId, Shipment, ShipmentId,
};
use super::error::ValidationErrors;
use super::repository::{PpmRepository, PpmTransaction, RepositoryError, UploadCounter};

#[derive(Debug, Clone, Default)]
struct StoreState {
    ppm_shipments: HashMap<PpmShipmentId, PpmShipment>,
    shipments: HashMap<ShipmentId, Shipment>,
}

impl StoreState {
    fn joined(&self, ppm: &PpmShipment) -> PpmShipment {
        let mut ppm = ppm.clone();
        if let Some(shipment) = ppm
            .shipment_id
            .and_then(|shipment_id| self.shipments.get(&shipment_id))
        {
            ppm.shipment = shipment.clone();
        }
        ppm
    }
}

/// In-process PPM shipment store. Each transaction works on a private copy of the data and
/// writes the records it touched back on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryPpmStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryPpmStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ppm store lock poisoned".to_string()))
    }

    /// Seeds a parent shipment outside any transaction, assigning an id when missing.
    pub fn insert_shipment(&self, mut shipment: Shipment) -> Result<Shipment, RepositoryError> {
        let id = *shipment.id.get_or_insert_with(ShipmentId::new);
        self.lock()?.shipments.insert(id, shipment.clone());
        Ok(shipment)
    }

    /// Committed view of a PPM shipment, including soft-deleted records.
    pub fn get(&self, id: PpmShipmentId) -> Result<Option<PpmShipment>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.ppm_shipments.get(&id).map(|ppm| state.joined(ppm)))
    }

    pub fn shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        Ok(self.lock()?.shipments.get(&id).cloned())
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.ppm_shipments.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.len()? == 0)
    }
}

impl PpmRepository for MemoryPpmStore {
    type Transaction = MemoryTransaction;

    fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let working = self.lock()?.clone();
        let read_versions = working
            .ppm_shipments
            .iter()
            .map(|(id, ppm)| (*id, ppm.updated_at))
            .collect();
        Ok(MemoryTransaction {
            shared: Arc::clone(&self.state),
            working,
            read_versions,
            touched_ppm_shipments: HashSet::new(),
            touched_shipments: HashSet::new(),
        })
    }
}

impl UploadCounter for MemoryPpmStore {
    fn count_active_uploads(&self, document: &DocumentId) -> Result<usize, RepositoryError> {
        let state = self.lock()?;
        for ppm in state.ppm_shipments.values() {
            let documents = ppm
                .weight_tickets
                .iter()
                .flat_map(|ticket| {
                    [
                        &ticket.empty_document,
                        &ticket.full_document,
                        &ticket.proof_of_trailer_ownership_document,
                    ]
                })
                .chain(
                    ppm.progear_weight_tickets
                        .iter()
                        .map(|ticket| &ticket.document),
                )
                .chain(ppm.moving_expenses.iter().map(|expense| &expense.document));

            for candidate in documents {
                if candidate.id == *document {
                    if candidate.deleted_at.is_some() {
                        return Ok(0);
                    }
                    return Ok(candidate.active_uploads().count());
                }
            }
        }
        Ok(0)
    }
}

/// Private working copy handed out by [`MemoryPpmStore::begin`]. Commit refuses to overwrite
/// a PPM shipment that another transaction committed after this one read it.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Mutex<StoreState>>,
    working: StoreState,
    read_versions: HashMap<PpmShipmentId, Option<DateTime<Utc>>>,
    touched_ppm_shipments: HashSet<PpmShipmentId>,
    touched_shipments: HashSet<ShipmentId>,
}

fn assign_address_id(address: &mut Option<Address>, address_id: &mut Option<AddressId>) {
    if let Some(address) = address {
        let id = *address
            .id
            .get_or_insert_with(|| address_id.unwrap_or_else(AddressId::new));
        *address_id = Some(id);
    }
}

fn assign_address_ids(ppm: &mut PpmShipment) {
    assign_address_id(&mut ppm.pickup_address, &mut ppm.pickup_address_id);
    assign_address_id(
        &mut ppm.secondary_pickup_address,
        &mut ppm.secondary_pickup_address_id,
    );
    assign_address_id(
        &mut ppm.tertiary_pickup_address,
        &mut ppm.tertiary_pickup_address_id,
    );
    assign_address_id(&mut ppm.destination_address, &mut ppm.destination_address_id);
    assign_address_id(
        &mut ppm.secondary_destination_address,
        &mut ppm.secondary_destination_address_id,
    );
    assign_address_id(
        &mut ppm.tertiary_destination_address,
        &mut ppm.tertiary_destination_address_id,
    );
    assign_address_id(&mut ppm.w2_address, &mut ppm.w2_address_id);
}

/// Column-level constraints the store enforces on every write.
fn structural_errors(
    ppm: &PpmShipment,
    shipments: &HashMap<ShipmentId, Shipment>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    match ppm.shipment_id {
        None => errors.add("shipment_id", "cannot be blank"),
        Some(id) if !shipments.contains_key(&id) => {
            errors.add("shipment_id", "does not reference a known shipment")
        }
        Some(_) => {}
    }
    if ppm.status.is_none() {
        errors.add("status", "cannot be blank");
    }
    if ppm.expected_departure_date.is_none() {
        errors.add("expected_departure_date", "cannot be blank");
    }
    errors
}

/// Strictly increasing so that every write produces a fresh version token.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if now <= previous => previous + Duration::microseconds(1),
        _ => now,
    }
}

impl PpmTransaction for MemoryTransaction {
    fn find_ppm_shipment(&mut self, id: PpmShipmentId) -> Result<PpmShipment, RepositoryError> {
        self.working
            .ppm_shipments
            .get(&id)
            .filter(|ppm| ppm.deleted_at.is_none())
            .map(|ppm| self.working.joined(ppm))
            .ok_or(RepositoryError::NotFound)
    }

    fn find_by_shipment_id(&mut self, id: ShipmentId) -> Result<PpmShipment, RepositoryError> {
        self.working
            .ppm_shipments
            .values()
            .find(|ppm| ppm.shipment_id == Some(id) && ppm.deleted_at.is_none())
            .map(|ppm| self.working.joined(ppm))
            .ok_or(RepositoryError::NotFound)
    }

    fn save_shipment(&mut self, shipment: &mut Shipment) -> Result<(), RepositoryError> {
        let id = *shipment.id.get_or_insert_with(ShipmentId::new);
        self.working.shipments.insert(id, shipment.clone());
        self.touched_shipments.insert(id);
        Ok(())
    }

    fn create_ppm_shipment(&mut self, ppm: &mut PpmShipment) -> Result<(), RepositoryError> {
        if let Some(id) = ppm.id {
            if self.working.ppm_shipments.contains_key(&id) {
                return Err(RepositoryError::Conflict);
            }
        }

        let errors = structural_errors(ppm, &self.working.shipments);
        if errors.has_any() {
            return Err(RepositoryError::Validation(errors));
        }

        let id = *ppm.id.get_or_insert_with(PpmShipmentId::new);
        assign_address_ids(ppm);
        let now = next_timestamp(None);
        ppm.created_at = Some(now);
        ppm.updated_at = Some(now);

        self.working.ppm_shipments.insert(id, ppm.clone());
        self.touched_ppm_shipments.insert(id);
        Ok(())
    }

    fn update_ppm_shipment(&mut self, ppm: &mut PpmShipment) -> Result<(), RepositoryError> {
        let Some(id) = ppm.id else {
            let mut errors = ValidationErrors::new();
            errors.add("id", "cannot be blank");
            return Err(RepositoryError::Validation(errors));
        };

        let previous = self
            .working
            .ppm_shipments
            .get(&id)
            .ok_or(RepositoryError::NotFound)?;

        let errors = structural_errors(ppm, &self.working.shipments);
        if errors.has_any() {
            return Err(RepositoryError::Validation(errors));
        }

        ppm.created_at = previous.created_at;
        ppm.updated_at = Some(next_timestamp(previous.updated_at));
        assign_address_ids(ppm);

        self.working.ppm_shipments.insert(id, ppm.clone());
        self.touched_ppm_shipments.insert(id);
        Ok(())
    }

    fn commit(self) -> Result<(), RepositoryError> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ppm store lock poisoned".to_string()))?;

        for id in &self.touched_ppm_shipments {
            let read = self.read_versions.get(id).copied().flatten();
            let current = shared.ppm_shipments.get(id).and_then(|ppm| ppm.updated_at);
            if current != read {
                return Err(RepositoryError::StaleVersion { id: id.0 });
            }
        }

        for id in &self.touched_shipments {
            if let Some(shipment) = self.working.shipments.get(id) {
                shared.shipments.insert(*id, shipment.clone());
            }
        }
        for id in &self.touched_ppm_shipments {
            if let Some(ppm) = self.working.ppm_shipments.get(id) {
                shared.ppm_shipments.insert(*id, ppm.clone());
            }
        }
        Ok(())
    }

    fn rollback(self) {}
}
