//! Result-entry and reception services.
//!
//! Services own the store and audit sink and are what API layers call. They apply the pure
//! domain operations, keep the store consistent, and write one audit event per action.

use crate::audit::{AuditEvent, AuditEventKind, AuditSink};
use crate::config::CoreConfig;
use crate::result_set::ResultSet;
use crate::sample::{Sample, SampleStatus};
use crate::store::{ResultSetStore, SampleStore};
use crate::submission::{evaluate_submission, SubmissionDecision};
use crate::verification::{accept, SampleRejection, VerificationChecklist};
use crate::worklist::{Page, WorklistQuery};
use crate::{LimsError, LimsResult};
use chrono::Utc;
use lims_types::NonEmptyText;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResultEntryService {
    cfg: Arc<CoreConfig>,
    store: ResultSetStore,
    audit: Arc<dyn AuditSink>,
}

impl ResultEntryService {
    pub fn new(cfg: Arc<CoreConfig>, store: ResultSetStore, audit: Arc<dyn AuditSink>) -> Self {
        Self { cfg, store, audit }
    }

    fn record(&self, sample_id: &str, operator: &NonEmptyText, kind: AuditEventKind) {
        self.audit.record(AuditEvent::new(
            self.cfg.site_code(),
            sample_id,
            operator.as_str(),
            kind,
        ));
    }

    pub fn create(&self, result_set: ResultSet) -> LimsResult<ResultSet> {
        let created = result_set.clone();
        self.store.insert(result_set)?;
        Ok(created)
    }

    pub fn get(&self, sample_id: &str) -> LimsResult<ResultSet> {
        self.store.get(sample_id)
    }

    pub fn list(&self) -> Vec<ResultSet> {
        self.store.list()
    }

    pub fn enter_value(
        &self,
        sample_id: &str,
        expected_version: u64,
        operator: &NonEmptyText,
        parameter_id: &str,
        raw_value: &str,
    ) -> LimsResult<ResultSet> {
        let (updated, ()) = self.store.update(sample_id, expected_version, |set| {
            set.enter_value(parameter_id, raw_value).map(|_| ())
        })?;
        self.record(
            sample_id,
            operator,
            AuditEventKind::ValueEntered {
                parameter_id: parameter_id.to_string(),
                raw_value: raw_value.to_string(),
            },
        );
        Ok(updated)
    }

    pub fn set_notes(
        &self,
        sample_id: &str,
        expected_version: u64,
        operator: &NonEmptyText,
        notes: &str,
    ) -> LimsResult<ResultSet> {
        let (updated, ()) = self
            .store
            .update(sample_id, expected_version, |set| set.set_notes(notes))?;
        self.record(sample_id, operator, AuditEventKind::NotesUpdated);
        Ok(updated)
    }

    pub fn set_critical_acknowledged(
        &self,
        sample_id: &str,
        expected_version: u64,
        operator: &NonEmptyText,
        acknowledged: bool,
    ) -> LimsResult<ResultSet> {
        let (updated, ()) = self.store.update(sample_id, expected_version, |set| {
            set.set_critical_acknowledged(acknowledged)
        })?;
        self.record(
            sample_id,
            operator,
            AuditEventKind::CriticalAcknowledged { acknowledged },
        );
        Ok(updated)
    }

    /// Run the gate against the stored set without changing anything.
    pub fn evaluate(&self, sample_id: &str) -> LimsResult<SubmissionDecision> {
        Ok(evaluate_submission(&self.store.get(sample_id)?))
    }

    /// Submit the stored set. The gate decision is audited whether or not it allows.
    pub fn submit(
        &self,
        sample_id: &str,
        expected_version: u64,
        operator: &NonEmptyText,
    ) -> LimsResult<(ResultSet, SubmissionDecision)> {
        let by = operator.clone();
        let outcome = self
            .store
            .update(sample_id, expected_version, |set| set.submit(by, Utc::now()));

        match outcome {
            Ok((updated, decision)) => {
                self.record(
                    sample_id,
                    operator,
                    AuditEventKind::SubmissionEvaluated {
                        decision: decision.clone(),
                    },
                );
                self.record(sample_id, operator, AuditEventKind::Submitted);
                Ok((updated, decision))
            }
            Err(LimsError::SubmissionRejected(decision)) => {
                self.record(
                    sample_id,
                    operator,
                    AuditEventKind::SubmissionEvaluated {
                        decision: decision.clone(),
                    },
                );
                Err(LimsError::SubmissionRejected(decision))
            }
            Err(other) => Err(other),
        }
    }
}

#[derive(Clone)]
pub struct ReceptionService {
    cfg: Arc<CoreConfig>,
    samples: SampleStore,
    audit: Arc<dyn AuditSink>,
}

impl ReceptionService {
    pub fn new(cfg: Arc<CoreConfig>, samples: SampleStore, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            cfg,
            samples,
            audit,
        }
    }

    pub fn register(&self, sample: Sample) -> LimsResult<()> {
        self.samples.insert(sample)
    }

    pub fn get(&self, sample_id: &str) -> LimsResult<Sample> {
        self.samples.get(sample_id)
    }

    pub fn worklist(&self, query: &WorklistQuery) -> Page<Sample> {
        query.run(&self.samples.list())
    }

    /// Accept a sample for testing once every required check passes.
    ///
    /// A sample still at `RECEIVED_AT_LAB` passes through `QUALITY_CHECK` first. The status
    /// move is validated before the checklist, so a sample that can no longer be accepted
    /// reports `InvalidTransition` whatever the checklist says.
    pub fn accept(
        &self,
        sample_id: &NonEmptyText,
        checklist: &VerificationChecklist,
        operator: &NonEmptyText,
    ) -> LimsResult<Sample> {
        let (accepted, ()) = self.samples.update(sample_id.as_str(), |sample| {
            if sample.status() == SampleStatus::ReceivedAtLab {
                sample.advance(SampleStatus::QualityCheck)?;
            }
            sample.advance(SampleStatus::Accepted)?;
            accept(sample_id, checklist)
        })?;
        self.audit.record(AuditEvent::new(
            self.cfg.site_code(),
            sample_id.as_str(),
            operator.as_str(),
            AuditEventKind::SampleAccepted,
        ));
        Ok(accepted)
    }

    pub fn reject(
        &self,
        rejection: &SampleRejection,
        operator: &NonEmptyText,
    ) -> LimsResult<Sample> {
        let (rejected, ()) = self
            .samples
            .update(rejection.sample_id.as_str(), |sample| {
                sample.advance(SampleStatus::Rejected)
            })?;
        tracing::info!(
            sample_id = %rejection.sample_id,
            category = %rejection.category,
            notify_phlebotomy = rejection.notify_phlebotomy,
            request_recollection = rejection.request_recollection,
            "sample rejected at reception"
        );
        self.audit.record(AuditEvent::new(
            self.cfg.site_code(),
            rejection.sample_id.as_str(),
            operator.as_str(),
            AuditEventKind::SampleRejected {
                category: rejection.category,
            },
        ));
        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::fixtures::{
        demo_result_set, demo_sample, demo_worklist, DEMO_RECEPTION_SAMPLE_ID,
        DEMO_RESULT_SAMPLE_ID,
    };
    use crate::result_set::ResultSetStatus;
    use crate::submission::RejectionReason;
    use crate::verification::RejectionCategory;
    use crate::worklist::WorklistFilter;

    fn operator() -> NonEmptyText {
        NonEmptyText::new("mlt.perera").expect("operator")
    }

    fn service() -> (ResultEntryService, MemoryAuditSink) {
        let audit = MemoryAuditSink::new();
        let service = ResultEntryService::new(
            Arc::new(CoreConfig::default()),
            ResultSetStore::new(),
            Arc::new(audit.clone()),
        );
        service
            .create(demo_result_set().expect("fixture"))
            .expect("create");
        (service, audit)
    }

    #[test]
    fn rejected_submission_is_audited_and_leaves_draft() {
        let (service, audit) = service();

        let err = service
            .submit(DEMO_RESULT_SAMPLE_ID, 0, &operator())
            .expect_err("critical not acknowledged");
        assert!(matches!(
            err,
            LimsError::SubmissionRejected(SubmissionDecision {
                reason: Some(RejectionReason::CriticalUnacknowledged),
                ..
            })
        ));

        let stored = service.get(DEMO_RESULT_SAMPLE_ID).expect("stored");
        assert_eq!(stored.status(), ResultSetStatus::Draft);
        assert_eq!(stored.version(), 0);

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].site_code, "lims.dev.1");
        assert!(matches!(events[0].kind, AuditEventKind::SubmissionEvaluated { .. }));
    }

    #[test]
    fn acknowledge_then_submit() {
        let (service, audit) = service();

        let acked = service
            .set_critical_acknowledged(DEMO_RESULT_SAMPLE_ID, 0, &operator(), true)
            .expect("acknowledge");
        assert_eq!(acked.version(), 1);
        assert_eq!(
            service.evaluate(DEMO_RESULT_SAMPLE_ID).expect("evaluate"),
            SubmissionDecision::allow()
        );

        let (submitted, decision) = service
            .submit(DEMO_RESULT_SAMPLE_ID, 1, &operator())
            .expect("submit");
        assert!(decision.allowed);
        assert_eq!(submitted.status(), ResultSetStatus::Submitted);

        let kinds: Vec<_> = audit.events().into_iter().map(|e| e.kind).collect();
        assert!(matches!(kinds[0], AuditEventKind::CriticalAcknowledged { acknowledged: true }));
        assert!(matches!(kinds[2], AuditEventKind::Submitted));
    }

    #[test]
    fn clearing_a_value_makes_set_incomplete() {
        let (service, _) = service();
        service
            .enter_value(DEMO_RESULT_SAMPLE_ID, 0, &operator(), "hgb", "  ")
            .expect("enter value");
        let decision = service.evaluate(DEMO_RESULT_SAMPLE_ID).expect("evaluate");
        assert_eq!(decision, SubmissionDecision::incomplete("Hemoglobin"));
    }

    #[test]
    fn stale_writer_gets_conflict() {
        let (service, audit) = service();
        service
            .set_notes(DEMO_RESULT_SAMPLE_ID, 0, &operator(), "first")
            .expect("notes");
        let err = service
            .enter_value(DEMO_RESULT_SAMPLE_ID, 0, &operator(), "k", "4.0")
            .expect_err("stale");
        assert!(matches!(err, LimsError::VersionConflict { .. }));
        assert_eq!(audit.events().len(), 1);
    }

    fn reception() -> (ReceptionService, MemoryAuditSink) {
        let audit = MemoryAuditSink::new();
        let reception = ReceptionService::new(
            Arc::new(CoreConfig::default()),
            SampleStore::new(),
            Arc::new(audit.clone()),
        );
        reception
            .register(demo_sample().expect("fixture"))
            .expect("register");
        for sample in demo_worklist().expect("fixture") {
            reception.register(sample).expect("register");
        }
        (reception, audit)
    }

    fn full_checklist() -> VerificationChecklist {
        let mut checklist = VerificationChecklist::standard();
        for id in ["barcode", "container", "condition", "window"] {
            checklist.set_checked(id, true).expect("check");
        }
        checklist
    }

    fn clotted(sample_id: &str) -> SampleRejection {
        SampleRejection::new(
            NonEmptyText::new(sample_id).expect("id"),
            RejectionCategory::Clotted,
            None,
            true,
            true,
        )
        .expect("rejection")
    }

    #[test]
    fn reception_accept_and_reject_are_audited() {
        let (reception, audit) = reception();
        let officer = NonEmptyText::new("reception.silva").expect("officer");
        let sample_id = NonEmptyText::new(DEMO_RECEPTION_SAMPLE_ID).expect("id");

        let err = reception
            .accept(&sample_id, &VerificationChecklist::standard(), &officer)
            .expect_err("nothing checked");
        assert!(matches!(err, LimsError::AcceptanceRejected(_)));
        assert_eq!(
            reception.get(DEMO_RECEPTION_SAMPLE_ID).expect("stored").status(),
            SampleStatus::QualityCheck
        );

        let accepted = reception
            .accept(&sample_id, &full_checklist(), &officer)
            .expect("accept");
        assert_eq!(accepted.status(), SampleStatus::Accepted);

        let rejected = reception
            .reject(&clotted("LB-2023-0877"), &officer)
            .expect("reject received sample");
        assert_eq!(rejected.status(), SampleStatus::Rejected);

        let kinds: Vec<_> = audit.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(matches!(kinds[0], AuditEventKind::SampleAccepted));
        assert!(matches!(
            kinds[1],
            AuditEventKind::SampleRejected {
                category: RejectionCategory::Clotted
            }
        ));
    }

    #[test]
    fn accepted_sample_cannot_be_rejected_or_accepted_again() {
        let (reception, audit) = reception();
        let officer = NonEmptyText::new("reception.silva").expect("officer");
        let sample_id = NonEmptyText::new(DEMO_RECEPTION_SAMPLE_ID).expect("id");
        reception
            .accept(&sample_id, &full_checklist(), &officer)
            .expect("accept");

        let err = reception
            .reject(&clotted(DEMO_RECEPTION_SAMPLE_ID), &officer)
            .expect_err("already accepted");
        assert!(matches!(
            err,
            LimsError::InvalidTransition {
                from: SampleStatus::Accepted,
                to: SampleStatus::Rejected
            }
        ));

        let err = reception
            .accept(&sample_id, &full_checklist(), &officer)
            .expect_err("accepted twice");
        assert!(matches!(
            err,
            LimsError::InvalidTransition {
                from: SampleStatus::Accepted,
                to: SampleStatus::Accepted
            }
        ));

        assert_eq!(
            reception.get(DEMO_RECEPTION_SAMPLE_ID).expect("stored").status(),
            SampleStatus::Accepted
        );
        assert_eq!(audit.events().len(), 1);
    }

    #[test]
    fn rejected_sample_cannot_be_accepted() {
        let (reception, _) = reception();
        let officer = NonEmptyText::new("reception.silva").expect("officer");
        reception
            .reject(&clotted("LB-2023-1004"), &officer)
            .expect("reject");
        let err = reception
            .accept(
                &NonEmptyText::new("LB-2023-1004").expect("id"),
                &full_checklist(),
                &officer,
            )
            .expect_err("rejected is terminal");
        assert!(matches!(err, LimsError::InvalidTransition { .. }));
    }

    #[test]
    fn unknown_sample_is_not_found() {
        let (reception, _) = reception();
        let officer = NonEmptyText::new("reception.silva").expect("officer");
        let err = reception
            .accept(
                &NonEmptyText::new("LB-0000").expect("id"),
                &full_checklist(),
                &officer,
            )
            .expect_err("unregistered");
        assert!(matches!(err, LimsError::NotFound(_)));
        assert!(matches!(
            reception.reject(&clotted("LB-0000"), &officer),
            Err(LimsError::NotFound(_))
        ));
    }

    #[test]
    fn worklist_reflects_status_changes() {
        let (reception, _) = reception();
        let officer = NonEmptyText::new("reception.silva").expect("officer");
        reception
            .accept(
                &NonEmptyText::new("LB-2023-0982").expect("id"),
                &full_checklist(),
                &officer,
            )
            .expect("accept received sample");

        let received = reception.worklist(&WorklistQuery::new(WorklistFilter {
            status: Some(SampleStatus::ReceivedAtLab),
            ..WorklistFilter::default()
        }));
        assert_eq!(received.total_items, 4);

        let all = reception.worklist(&WorklistQuery::default());
        assert_eq!(all.total_items, 6);
        assert_eq!(all.total_pages, 1);
    }
}
