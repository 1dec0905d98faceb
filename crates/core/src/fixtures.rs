//! Demo data for local development.
//!
//! Loaded by the CLI `demo` command and by the REST service when `LIMS_SEED_DEMO` is set.

use crate::flag::ReferenceRange;
use crate::result_set::{Parameter, ParameterGroup, ResultSet};
use crate::sample::{Gender, Patient, Priority, Sample, SampleStatus, TubeType};
use crate::verification::VerificationChecklist;
use crate::LimsResult;
use lims_types::NonEmptyText;

pub const DEMO_RESULT_SAMPLE_ID: &str = "SAPP-2025-9912";
pub const DEMO_RECEPTION_SAMPLE_ID: &str = "77291034";

fn text(value: &str) -> LimsResult<NonEmptyText> {
    Ok(NonEmptyText::new(value)?)
}

fn param(
    id: &str,
    name: &str,
    raw: &str,
    unit: &str,
    low: f64,
    high: f64,
) -> LimsResult<Parameter> {
    Ok(Parameter::new(text(id)?, text(name)?, unit, ReferenceRange::new(low, high)?).with_value(raw))
}

/// ICU stat request with a critically high potassium.
pub fn demo_result_set() -> LimsResult<ResultSet> {
    let groups = vec![
        ParameterGroup::new(
            "COMPLETE BLOOD COUNT",
            vec![
                param("wbc", "WBC (White Blood Cells)", "7.2", "10³/µL", 4.0, 10.0)?,
                param("rbc", "RBC (Red Blood Cells)", "3.9", "10⁶/µL", 4.5, 5.5)?,
                param("hgb", "Hemoglobin", "11.2", "g/dL", 12.0, 17.0)?,
                param("hct", "Hematocrit (HCT)", "34.5", "%", 36.0, 50.0)?,
                param("plt", "Platelets", "185", "10³/µL", 150.0, 400.0)?,
            ],
        ),
        ParameterGroup::new(
            "SERUM ELECTROLYTES",
            vec![
                param("na", "Sodium (Na+)", "138", "mmol/L", 135.0, 145.0)?,
                param("k", "Potassium (K+)", "6.8", "mmol/L", 3.5, 5.1)?,
                param("cl", "Chloride (Cl-)", "101", "mmol/L", 96.0, 106.0)?,
            ],
        ),
    ];

    Ok(
        ResultSet::new(text(DEMO_RESULT_SAMPLE_ID)?, "CBC + Serum Electrolytes", groups)?
            .with_notes("Result confirmed by 2nd run. No hemolysis noted in sample."),
    )
}

/// Sample awaiting pre-analytical verification at reception.
pub fn demo_sample() -> LimsResult<Sample> {
    Ok(Sample::new(
        text(DEMO_RECEPTION_SAMPLE_ID)?,
        text("ORD-2024-099")?,
        Patient {
            pid: text("DH-882-0034")?,
            name: text("Sandhya Rajakaruna")?,
            age: 64,
            gender: Gender::Female,
            ward_room: Some("General Ward 03, Bed 12-A".into()),
            mrn: Some("882-0034".into()),
        },
        "Full Blood Count (FBC) + ESR",
        vec!["FBC".into(), "ESR".into()],
        Priority::Normal,
        vec![TubeType::EdtaPurple],
        SampleStatus::QualityCheck,
    ))
}

#[allow(clippy::too_many_arguments)]
fn received(
    sample_id: &str,
    order_id: &str,
    patient: Patient,
    test_type: &str,
    test_codes: &[&str],
    priority: Priority,
    tube: TubeType,
    department: &str,
) -> LimsResult<Sample> {
    Ok(Sample::new(
        text(sample_id)?,
        text(order_id)?,
        patient,
        test_type,
        test_codes.iter().map(|c| c.to_string()).collect(),
        priority,
        vec![tube],
        SampleStatus::ReceivedAtLab,
    )
    .with_department(department))
}

fn patient(pid: &str, name: &str, age: u16, gender: Gender, ward: &str) -> LimsResult<Patient> {
    Ok(Patient {
        pid: text(pid)?,
        name: text(name)?,
        age,
        gender,
        ward_room: Some(ward.into()),
        mrn: None,
    })
}

/// Technologist worklist: samples received at the lab and routed to a bench.
pub fn demo_worklist() -> LimsResult<Vec<Sample>> {
    Ok(vec![
        received(
            "LB-2023-0982",
            "ORD-2024-101",
            patient("DH-40281", "Mrs. Kumari Rathnayake", 40, Gender::Female, "Ward 04")?,
            "FBC & CRP",
            &["FBC", "CRP"],
            Priority::Urgent,
            TubeType::EdtaLavender,
            "Haematology",
        )?,
        received(
            "LB-2023-1004",
            "ORD-2024-102",
            patient("DH-41082", "Mr. Chaminda Silva", 62, Gender::Male, "ICU-02")?,
            "Arterial Blood Gas",
            &["ABG"],
            Priority::Urgent,
            TubeType::HeparinGreen,
            "Biochemistry",
        )?,
        received(
            "LB-2023-0877",
            "ORD-2024-103",
            patient("DH-38901", "Ms. Ishara Perera", 28, Gender::Female, "OPD")?,
            "Lipid Profile",
            &["LIPID"],
            Priority::Normal,
            TubeType::SstGold,
            "Biochemistry",
        )?,
        received(
            "LB-2023-0975",
            "ORD-2024-104",
            patient("DH-40012", "Master Rahul Naveen", 8, Gender::Male, "Paediatrics")?,
            "Blood Grouping",
            &["ABO-RH"],
            Priority::Normal,
            TubeType::EdtaLavender,
            "Blood Bank",
        )?,
        received(
            "LB-2023-0991",
            "ORD-2024-105",
            patient("DH-39821", "Mrs. Preethi Fernando", 35, Gender::Female, "Ward 02")?,
            "Thyroid Panel (T3, T4, TSH)",
            &["T3", "T4", "TSH"],
            Priority::Normal,
            TubeType::SstGold,
            "Immunology",
        )?,
    ])
}

/// Standard checklist with the collection window already confirmed by the scanner.
pub fn demo_checklist() -> LimsResult<VerificationChecklist> {
    let mut checklist = VerificationChecklist::standard();
    checklist.set_checked("window", true)?;
    Ok(checklist)
}
