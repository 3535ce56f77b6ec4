use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use doctor_cell::services::directory::DoctorDirectoryService;
use shared_config::AppConfig;

use crate::models::{AlternativeSlot, AppointmentError};
use crate::services::slots::{FixedGrid, SlotGrid};
use crate::services::store::AppointmentStore;

pub struct AvailabilityService {
    store: AppointmentStore,
    directory: DoctorDirectoryService,
    grid: Box<dyn SlotGrid>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_grid(config, Box::new(FixedGrid))
    }

    /// Substitute a different probing strategy without touching the
    /// conflict-detection contract.
    pub fn with_grid(config: &AppConfig, grid: Box<dyn SlotGrid>) -> Self {
        Self {
            store: AppointmentStore::new(config),
            directory: DoctorDirectoryService::new(config),
            grid,
        }
    }

    /// Whether [start_time, end_time) is free for the exact
    /// (clinic, doctor, resource) triple. An inverted interval can never
    /// overlap anything and so reports available; callers validate their
    /// input before booking.
    pub async fn is_slot_available(
        &self,
        clinic_id: i64,
        doctor_id: i64,
        resource_id: i64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        debug!(
            "Checking availability for clinic {} doctor {} resource {} from {} to {}",
            clinic_id, doctor_id, resource_id, start_time, end_time
        );

        let overlapping = self
            .store
            .find_overlapping(clinic_id, doctor_id, resource_id, start_time, end_time, auth_token)
            .await?;

        Ok(overlapping.is_empty())
    }

    /// Suggest up to `num_alternatives` free slots of the same duration,
    /// assuming the requested interval itself already failed the check.
    ///
    /// Probing order: later the same day, then business hours over the next
    /// `days_range` days, then (optionally) other doctors of the clinic at
    /// the original time and later the same day. The search stops as soon
    /// as enough slots are collected; it may return fewer than requested.
    pub async fn find_alternatives(
        &self,
        clinic_id: i64,
        doctor_id: i64,
        resource_id: i64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        num_alternatives: usize,
        days_range: i64,
        check_other_doctors: bool,
        auth_token: &str,
    ) -> Result<Vec<AlternativeSlot>, AppointmentError> {
        let duration = end_time - start_time;
        let mut alternatives: Vec<AlternativeSlot> = Vec::new();

        // Phase 1: later the same day, same doctor and resource
        for candidate in self.grid.later_same_day(start_time) {
            if alternatives.len() >= num_alternatives {
                return Ok(alternatives);
            }
            self.probe(clinic_id, doctor_id, resource_id, candidate, duration, None, &mut alternatives, auth_token)
                .await?;
        }

        // Phase 2: business-hour grid over the following days
        for day_offset in 1..=days_range {
            let date = start_time.date() + Duration::days(day_offset);
            for candidate in self.grid.business_day(date) {
                if alternatives.len() >= num_alternatives {
                    return Ok(alternatives);
                }
                self.probe(clinic_id, doctor_id, resource_id, candidate, duration, None, &mut alternatives, auth_token)
                    .await?;
            }
        }

        if alternatives.len() >= num_alternatives || !check_other_doctors {
            return Ok(alternatives);
        }

        // Phase 3: other doctors of the clinic. A directory failure is not a
        // search failure; whatever the earlier phases found still stands.
        let doctors = match self.directory.list_clinic_doctors(clinic_id, auth_token).await {
            Ok(doctors) => doctors,
            Err(e) => {
                warn!(
                    "Doctor directory lookup failed for clinic {}, skipping cross-doctor search: {}",
                    clinic_id, e
                );
                return Ok(alternatives);
            }
        };

        for doctor in doctors.iter().filter(|d| d.id != doctor_id) {
            if alternatives.len() >= num_alternatives {
                break;
            }

            // The originally requested interval first, then the same-day scan
            let substitute = Some((doctor.id, doctor.full_name()));
            let took_original = self
                .probe(clinic_id, doctor.id, resource_id, start_time, duration, substitute.clone(), &mut alternatives, auth_token)
                .await?;
            if took_original {
                continue;
            }

            for candidate in self.grid.later_same_day(start_time) {
                if alternatives.len() >= num_alternatives {
                    break;
                }
                self.probe(clinic_id, doctor.id, resource_id, candidate, duration, substitute.clone(), &mut alternatives, auth_token)
                    .await?;
            }
        }

        Ok(alternatives)
    }

    /// Check one candidate interval and record it if free. Returns whether
    /// the candidate was recorded.
    async fn probe(
        &self,
        clinic_id: i64,
        doctor_id: i64,
        resource_id: i64,
        candidate_start: NaiveDateTime,
        duration: Duration,
        substitute_doctor: Option<(i64, String)>,
        alternatives: &mut Vec<AlternativeSlot>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let candidate_end = candidate_start + duration;

        if self
            .is_slot_available(clinic_id, doctor_id, resource_id, candidate_start, candidate_end, auth_token)
            .await?
        {
            let (doctor_id, doctor_name) = match substitute_doctor {
                Some((id, name)) => (Some(id), Some(name)),
                None => (None, None),
            };
            alternatives.push(AlternativeSlot {
                start_time: candidate_start,
                end_time: candidate_end,
                doctor_id,
                doctor_name,
            });
            return Ok(true);
        }

        Ok(false)
    }
}
