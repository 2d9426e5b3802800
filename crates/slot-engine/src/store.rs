//! The persistence seam.
//!
//! [`ScheduleStore`] is the read/write interface the engine consumes from the
//! surrounding system. [`MemoryStore`] implements it over an in-process
//! [`Catalog`], which can be loaded from and saved to JSON.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};
use crate::interval::TimeInterval;
use crate::model::{
    Appointment, AppointmentStatus, Attendee, AvailabilityException, AvailabilityRule, Business,
    BusinessBlackout, Client, ClientInfo, NewAppointment, Service, Staff,
};

/// Create/read/count operations over business records.
///
/// Window arguments select records overlapping the window unless stated
/// otherwise. Appointment reads only return active appointments, except for
/// [`ScheduleStore::appointments_for_business`].
pub trait ScheduleStore: Send + Sync {
    fn business(&self, id: Uuid) -> Result<Option<Business>>;

    fn service(&self, id: Uuid) -> Result<Option<Service>>;

    /// Active services offered by a business.
    fn services_for_business(&self, business_id: Uuid) -> Result<Vec<Service>>;

    /// Active staff of a business, sorted by name.
    fn staff_for_business(&self, business_id: Uuid) -> Result<Vec<Staff>>;

    /// Ids of active staff assigned to a service, in a stable order.
    fn staff_for_service(&self, service_id: Uuid) -> Result<Vec<Uuid>>;

    fn active_rules(&self, staff_id: Uuid) -> Result<Vec<AvailabilityRule>>;

    fn exceptions(
        &self,
        staff_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Vec<AvailabilityException>>;

    fn blackouts(
        &self,
        business_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Vec<BusinessBlackout>>;

    fn active_appointments(
        &self,
        staff_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Vec<Appointment>>;

    /// Number of active appointments lying entirely inside `window`.
    fn count_active_within(&self, staff_id: Uuid, window: &TimeInterval) -> Result<usize>;

    /// The active appointment for this staff member and service on exactly `window`.
    fn find_active_appointment(
        &self,
        staff_id: Uuid,
        service_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Option<Appointment>>;

    fn appointment(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// Appointments of a business in any status lying entirely inside
    /// `window`, optionally for one staff member, sorted by start.
    fn appointments_for_business(
        &self,
        business_id: Uuid,
        window: &TimeInterval,
        staff_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>>;

    fn client(&self, id: Uuid) -> Result<Option<Client>>;

    fn create_appointment(&self, new: NewAppointment) -> Result<Appointment>;

    /// Attach a client to a group appointment, returning the updated record.
    fn add_attendee(&self, appointment_id: Uuid, client_id: Uuid) -> Result<Appointment>;

    fn set_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Appointment>;

    /// Match a client of the business by email or phone, creating one if none matches.
    fn find_or_create_client(&self, business_id: Uuid, info: &ClientInfo) -> Result<Uuid>;
}

/// Every record a [`MemoryStore`] holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub businesses: Vec<Business>,
    pub staff: Vec<Staff>,
    pub services: Vec<Service>,
    pub rules: Vec<AvailabilityRule>,
    pub exceptions: Vec<AvailabilityException>,
    pub blackouts: Vec<BusinessBlackout>,
    pub clients: Vec<Client>,
    pub appointments: Vec<Appointment>,
    pub attendees: Vec<Attendee>,
}

/// An in-process store guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)
            .map_err(|e| SchedulingError::InvalidInput(format!("invalid catalog JSON: {}", e)))?;
        Ok(Self::new(catalog))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.catalog.read())
            .map_err(|e| SchedulingError::Store(format!("serialization error: {}", e)))
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Catalog {
        self.catalog.read().clone()
    }
}

fn contact_matches(client: &Client, info: &ClientInfo) -> bool {
    let same = |a: &Option<String>, b: &Option<String>| match (a.as_deref(), b.as_deref()) {
        (Some(a), Some(b)) => !b.trim().is_empty() && a.eq_ignore_ascii_case(b.trim()),
        _ => false,
    };
    same(&client.email, &info.email) || same(&client.phone, &info.phone)
}

impl ScheduleStore for MemoryStore {
    fn business(&self, id: Uuid) -> Result<Option<Business>> {
        Ok(self.catalog.read().businesses.iter().find(|b| b.id == id).cloned())
    }

    fn service(&self, id: Uuid) -> Result<Option<Service>> {
        Ok(self.catalog.read().services.iter().find(|s| s.id == id).cloned())
    }

    fn services_for_business(&self, business_id: Uuid) -> Result<Vec<Service>> {
        Ok(self
            .catalog
            .read()
            .services
            .iter()
            .filter(|s| s.business_id == business_id && s.active)
            .cloned()
            .collect())
    }

    fn staff_for_business(&self, business_id: Uuid) -> Result<Vec<Staff>> {
        let mut staff: Vec<Staff> = self
            .catalog
            .read()
            .staff
            .iter()
            .filter(|s| s.business_id == business_id && s.active)
            .cloned()
            .collect();
        staff.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(staff)
    }

    fn staff_for_service(&self, service_id: Uuid) -> Result<Vec<Uuid>> {
        let catalog = self.catalog.read();
        let Some(service) = catalog.services.iter().find(|s| s.id == service_id) else {
            return Ok(Vec::new());
        };
        // Assigned ids with no staff record are kept; known staff must be
        // active and belong to the service's business.
        let eligible = |s: &Staff| s.active && s.business_id == service.business_id;
        Ok(service
            .staff_ids
            .iter()
            .copied()
            .filter(|id| catalog.staff.iter().all(|s| s.id != *id || eligible(s)))
            .collect())
    }

    fn active_rules(&self, staff_id: Uuid) -> Result<Vec<AvailabilityRule>> {
        Ok(self
            .catalog
            .read()
            .rules
            .iter()
            .filter(|r| r.staff_id == staff_id && r.active)
            .cloned()
            .collect())
    }

    fn exceptions(
        &self,
        staff_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Vec<AvailabilityException>> {
        Ok(self
            .catalog
            .read()
            .exceptions
            .iter()
            .filter(|e| e.staff_id == staff_id && e.window().overlaps(window))
            .cloned()
            .collect())
    }

    fn blackouts(
        &self,
        business_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Vec<BusinessBlackout>> {
        Ok(self
            .catalog
            .read()
            .blackouts
            .iter()
            .filter(|b| b.business_id == business_id && b.window().overlaps(window))
            .cloned()
            .collect())
    }

    fn active_appointments(
        &self,
        staff_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Vec<Appointment>> {
        Ok(self
            .catalog
            .read()
            .appointments
            .iter()
            .filter(|a| a.staff_id == staff_id && a.is_active() && a.window().overlaps(window))
            .cloned()
            .collect())
    }

    fn count_active_within(&self, staff_id: Uuid, window: &TimeInterval) -> Result<usize> {
        Ok(self
            .catalog
            .read()
            .appointments
            .iter()
            .filter(|a| a.staff_id == staff_id && a.is_active() && window.contains(&a.window()))
            .count())
    }

    fn find_active_appointment(
        &self,
        staff_id: Uuid,
        service_id: Uuid,
        window: &TimeInterval,
    ) -> Result<Option<Appointment>> {
        Ok(self
            .catalog
            .read()
            .appointments
            .iter()
            .find(|a| {
                a.staff_id == staff_id
                    && a.service_id == service_id
                    && a.is_active()
                    && a.window() == *window
            })
            .cloned())
    }

    fn appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.catalog.read().appointments.iter().find(|a| a.id == id).cloned())
    }

    fn appointments_for_business(
        &self,
        business_id: Uuid,
        window: &TimeInterval,
        staff_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .catalog
            .read()
            .appointments
            .iter()
            .filter(|a| a.business_id == business_id && window.contains(&a.window()))
            .filter(|a| staff_id.map_or(true, |id| a.staff_id == id))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.start_at, a.end_at));
        Ok(appointments)
    }

    fn client(&self, id: Uuid) -> Result<Option<Client>> {
        Ok(self.catalog.read().clients.iter().find(|c| c.id == id).cloned())
    }

    fn create_appointment(&self, new: NewAppointment) -> Result<Appointment> {
        if !new.window.is_valid() {
            return Err(SchedulingError::InvalidInput(format!(
                "appointment window {} - {} is empty",
                new.window.start, new.window.end
            )));
        }
        let appointment = Appointment {
            id: Uuid::new_v4(),
            business_id: new.business_id,
            staff_id: new.staff_id,
            service_id: new.service_id,
            client_id: new.client_id,
            start_at: new.window.start,
            end_at: new.window.end,
            status: new.status,
            attendee_count: 0,
        };
        self.catalog.write().appointments.push(appointment.clone());
        Ok(appointment)
    }

    fn add_attendee(&self, appointment_id: Uuid, client_id: Uuid) -> Result<Appointment> {
        let mut catalog = self.catalog.write();
        let appointment = catalog
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {}", appointment_id)))?;
        appointment.attendee_count += 1;
        let updated = appointment.clone();
        catalog.attendees.push(Attendee {
            appointment_id,
            client_id,
        });
        Ok(updated)
    }

    fn set_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Appointment> {
        let mut catalog = self.catalog.write();
        let appointment = catalog
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("appointment {}", appointment_id)))?;
        appointment.status = status;
        Ok(appointment.clone())
    }

    fn find_or_create_client(&self, business_id: Uuid, info: &ClientInfo) -> Result<Uuid> {
        if !info.has_identity() {
            return Err(SchedulingError::InvalidInput(
                "client email or phone is required".to_string(),
            ));
        }
        // Hold the write lock across lookup and insert so one contact maps to one client.
        let mut catalog = self.catalog.write();
        if let Some(existing) = catalog
            .clients
            .iter()
            .find(|c| c.business_id == business_id && contact_matches(c, info))
        {
            return Ok(existing.id);
        }
        let client = Client {
            id: Uuid::new_v4(),
            business_id,
            email: info.email.clone(),
            phone: info.phone.clone(),
            first_name: info.first_name.clone(),
            last_name: info.last_name.clone(),
        };
        let id = client.id;
        catalog.clients.push(client);
        Ok(id)
    }
}
