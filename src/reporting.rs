//! Read-only revenue rollups over invoices and visit charges.
//!
//! All money stays in `Decimal`; rows come back as stored text and are
//! summed here rather than in SQL so totals never pass through floats.

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::repository::parse_money;
use crate::db::DatabaseError;

/// One patient's charge on a daily invoice.
#[derive(Debug, Clone, Serialize)]
pub struct PatientCharge {
    pub patient_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceBreakdown {
    pub invoice_id: i64,
    pub total_cost: Decimal,
    pub charges: Vec<PatientCharge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsurerDailyInvoices {
    pub insurance_id: i64,
    pub insurer_name: String,
    pub invoices: Vec<InvoiceBreakdown>,
}

/// All invoices dated `date`, grouped insurer → invoice → patient charges.
///
/// Ordered by insurer id, then invoice id, then patient id, so repeated runs
/// over the same data produce identical output.
pub fn daily_invoices_by_insurer(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<InsurerDailyInvoices>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT ic.insurance_id, ic.name, i.invoice_id, i.total_cost,
                p.patient_id, p.first_name, p.last_name, d.cost
         FROM insurance_companies ic
         JOIN invoices i ON i.insurance_id = ic.insurance_id
         JOIN invoice_details d ON d.invoice_id = i.invoice_id
         JOIN patients p ON p.patient_id = d.patient_id
         WHERE i.invoice_date = ?1
         ORDER BY ic.insurance_id, i.invoice_id, p.patient_id",
    )?;

    let rows = stmt.query_map(params![date], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut report: Vec<InsurerDailyInvoices> = Vec::new();
    for row in rows {
        let (insurance_id, insurer_name, invoice_id, total_cost, patient_id, first, last, cost) =
            row?;

        if report.last().map(|r| r.insurance_id) != Some(insurance_id) {
            report.push(InsurerDailyInvoices {
                insurance_id,
                insurer_name,
                invoices: Vec::new(),
            });
        }
        let insurer = report.last_mut().expect("pushed above");

        if insurer.invoices.last().map(|i| i.invoice_id) != Some(invoice_id) {
            insurer.invoices.push(InvoiceBreakdown {
                invoice_id,
                total_cost: parse_money(&total_cost)?,
                charges: Vec::new(),
            });
        }
        insurer
            .invoices
            .last_mut()
            .expect("pushed above")
            .charges
            .push(PatientCharge {
                patient_id,
                first_name: first,
                last_name: last,
                cost: parse_money(&cost)?,
            });
    }
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRevenue {
    pub date: NaiveDate,
    pub total: Decimal,
}

/// The five highest-revenue days of the given month, descending by total.
/// Ties break toward the earlier date.
pub fn top_revenue_days(
    conn: &Connection,
    year: i32,
    month: u32,
) -> Result<Vec<DayRevenue>, DatabaseError> {
    let Some((begin, end)) = month_bounds(year, month) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(
        "SELECT invoice_date, total_cost FROM invoices
         WHERE invoice_date >= ?1 AND invoice_date <= ?2",
    )?;
    let rows = stmt.query_map(params![begin, end], |row| {
        Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut by_day: std::collections::BTreeMap<NaiveDate, Decimal> =
        std::collections::BTreeMap::new();
    for row in rows {
        let (date, total) = row?;
        *by_day.entry(date).or_default() += parse_money(&total)?;
    }

    // BTreeMap iteration is date-ascending; the stable sort keeps that order
    // among equal totals.
    let mut days: Vec<DayRevenue> = by_day
        .into_iter()
        .map(|(date, total)| DayRevenue { date, total })
        .collect();
    days.sort_by(|a, b| b.total.cmp(&a.total));
    days.truncate(5);
    Ok(days)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsurerAverage {
    pub insurance_id: i64,
    pub insurer_name: String,
    pub average_revenue: Decimal,
}

/// Mean invoice total per insurer over `[begin, end]` inclusive, rounded to
/// cents. Insurers with no invoices in the range are omitted.
pub fn average_revenue_by_insurer(
    conn: &Connection,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<InsurerAverage>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT ic.insurance_id, ic.name, i.total_cost
         FROM insurance_companies ic
         JOIN invoices i ON i.insurance_id = ic.insurance_id
         WHERE i.invoice_date >= ?1 AND i.invoice_date <= ?2
         ORDER BY ic.insurance_id",
    )?;
    let rows = stmt.query_map(params![begin, end], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut sums: Vec<(i64, String, Decimal, u32)> = Vec::new();
    for row in rows {
        let (insurance_id, name, total) = row?;
        let total = parse_money(&total)?;
        match sums.last_mut() {
            Some((id, _, sum, count)) if *id == insurance_id => {
                *sum += total;
                *count += 1;
            }
            _ => sums.push((insurance_id, name, total, 1)),
        }
    }

    Ok(sums
        .into_iter()
        .map(|(insurance_id, insurer_name, sum, count)| InsurerAverage {
            insurance_id,
            insurer_name,
            average_revenue: (sum / Decimal::from(count)).round_dp(2),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRevenue {
    pub patient_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityRevenue {
    pub facility_id: i64,
    pub address: String,
    pub total: Decimal,
    pub by_patient: Vec<PatientRevenue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyFacilityReport {
    pub date: NaiveDate,
    pub facilities: Vec<FacilityRevenue>,
    pub grand_total: Decimal,
}

/// Revenue for one calendar date broken down by facility and, within each
/// facility, by patient. Facilities with no visits that day are omitted.
pub fn revenue_by_facility(
    conn: &Connection,
    date: NaiveDate,
) -> Result<DailyFacilityReport, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT f.facility_id, f.address, p.patient_id, p.first_name, p.last_name, d.cost
         FROM facilities f
         JOIN appointments a ON a.facility_id = f.facility_id
         JOIN invoice_details d
           ON d.patient_id = a.patient_id
          AND d.facility_id = a.facility_id
          AND d.doctor_id = a.doctor_id
          AND d.scheduled_at = a.scheduled_at
         JOIN patients p ON p.patient_id = a.patient_id
         WHERE date(a.scheduled_at) = ?1
         ORDER BY f.facility_id, p.patient_id",
    )?;
    let rows = stmt.query_map(params![date], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut facilities: Vec<FacilityRevenue> = Vec::new();
    let mut grand_total = Decimal::ZERO;
    for row in rows {
        let (facility_id, address, patient_id, first, last, cost) = row?;
        let cost = parse_money(&cost)?;
        grand_total += cost;

        if facilities.last().map(|f| f.facility_id) != Some(facility_id) {
            facilities.push(FacilityRevenue {
                facility_id,
                address,
                total: Decimal::ZERO,
                by_patient: Vec::new(),
            });
        }
        let facility = facilities.last_mut().expect("pushed above");
        facility.total += cost;

        match facility.by_patient.last_mut() {
            Some(patient) if patient.patient_id == patient_id => patient.total += cost,
            _ => facility.by_patient.push(PatientRevenue {
                patient_id,
                first_name: first,
                last_name: last,
                total: cost,
            }),
        }
    }

    Ok(DailyFacilityReport {
        date,
        facilities,
        grand_total,
    })
}

/// Convenience filter for month-scoped views.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let begin = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = begin
        .checked_add_months(chrono::Months::new(1))?
        .pred_opt()?;
    debug_assert_eq!(begin.month(), month);
    Some((begin, end))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use rust_decimal::Decimal;

    use super::*;
    use crate::billing::{create_appointment, update_appointment_cost};
    use crate::db::repository::{
        find_or_create_invoice, insert_employee, insert_facility, insert_insurance_company,
        insert_patient,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::{
        Appointment, AppointmentKey, FacilityKind, JobRole, NewEmployee, NewFacility,
        NewInsuranceCompany, NewPatient,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        conn: Connection,
        insurer_a: i64,
        insurer_b: i64,
        facility_a: i64,
        facility_b: i64,
        doctor: i64,
        patient_a: i64,
        patient_b: i64,
    }

    fn fixture() -> Fixture {
        let conn = open_memory_database().unwrap();
        let insurer_a = insert_insurance_company(
            &conn,
            &NewInsuranceCompany {
                name: "Acme Health".into(),
                address: "100 Carrier Way".into(),
            },
        )
        .unwrap();
        let insurer_b = insert_insurance_company(
            &conn,
            &NewInsuranceCompany {
                name: "Borealis Mutual".into(),
                address: "7 North Ave".into(),
            },
        )
        .unwrap();
        let facility_a = insert_facility(
            &conn,
            &NewFacility {
                address: "12 Clinic Rd".into(),
                size: 400,
                kind: FacilityKind::Office { office_count: 6 },
            },
        )
        .unwrap();
        let facility_b = insert_facility(
            &conn,
            &NewFacility {
                address: "9 Surgical Ct".into(),
                size: 1200,
                kind: FacilityKind::OutpatientSurgery {
                    room_count: 4,
                    description: "Same-day orthopedic".into(),
                    procedure_code: "ORTHO-SD".into(),
                },
            },
        )
        .unwrap();
        let doctor = insert_employee(
            &conn,
            &NewEmployee {
                ssn: "900-11-2222".into(),
                first_name: "Greta".into(),
                last_name: "Osei".into(),
                salary: Decimal::new(185_000_00, 2),
                hire_date: date(2019, 6, 1),
                address: "8 Birch Ln".into(),
                facility_id: facility_a,
                role: JobRole::Doctor {
                    speciality: "Cardiology".into(),
                    board_certified: date(2015, 3, 12),
                },
            },
        )
        .unwrap();
        let patient_a = insert_patient(
            &conn,
            &NewPatient {
                first_name: "Sam".into(),
                last_name: "Rivera".into(),
                primary_doctor_id: Some(doctor),
                insurance_id: Some(insurer_a),
            },
        )
        .unwrap();
        let patient_b = insert_patient(
            &conn,
            &NewPatient {
                first_name: "Lee".into(),
                last_name: "Nowak".into(),
                primary_doctor_id: Some(doctor),
                insurance_id: Some(insurer_b),
            },
        )
        .unwrap();

        Fixture {
            conn,
            insurer_a,
            insurer_b,
            facility_a,
            facility_b,
            doctor,
            patient_a,
            patient_b,
        }
    }

    impl Fixture {
        fn visit(&self, patient: i64, facility: i64, when: chrono::NaiveDateTime, cents: i64) {
            let key = AppointmentKey {
                patient_id: patient,
                facility_id: facility,
                doctor_id: self.doctor,
                scheduled_at: when,
            };
            create_appointment(
                &self.conn,
                &Appointment {
                    key: key.clone(),
                    description: "visit".into(),
                },
            )
            .unwrap();
            update_appointment_cost(&self.conn, &key, Decimal::new(cents, 2)).unwrap();
        }
    }

    #[test]
    fn daily_report_nests_and_orders_by_ids() {
        let f = fixture();
        let day = date(2024, 4, 27);
        f.visit(f.patient_b, f.facility_a, day.and_hms_opt(9, 0, 0).unwrap(), 80_00);
        f.visit(f.patient_a, f.facility_a, day.and_hms_opt(10, 0, 0).unwrap(), 120_25);
        f.visit(f.patient_a, f.facility_b, day.and_hms_opt(14, 0, 0).unwrap(), 300_00);

        let report = daily_invoices_by_insurer(&f.conn, day).unwrap();
        assert_eq!(report.len(), 2);

        assert_eq!(report[0].insurance_id, f.insurer_a);
        assert_eq!(report[0].invoices.len(), 1);
        let acme = &report[0].invoices[0];
        assert_eq!(acme.total_cost, Decimal::new(420_25, 2));
        assert_eq!(acme.charges.len(), 2);
        assert!(acme.charges.iter().all(|c| c.patient_id == f.patient_a));

        assert_eq!(report[1].insurance_id, f.insurer_b);
        assert_eq!(report[1].invoices[0].charges.len(), 1);
        assert_eq!(report[1].invoices[0].charges[0].cost, Decimal::new(80_00, 2));
    }

    #[test]
    fn daily_report_other_dates_excluded() {
        let f = fixture();
        f.visit(
            f.patient_a,
            f.facility_a,
            date(2024, 4, 26).and_hms_opt(9, 0, 0).unwrap(),
            50_00,
        );

        let report = daily_invoices_by_insurer(&f.conn, date(2024, 4, 27)).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn top_revenue_days_orders_descending() {
        let f = fixture();
        let slots: [(u32, i64); 3] = [(1, 500_00), (2, 1200_00), (3, 300_00)];
        for (day, cents) in slots {
            f.visit(
                f.patient_a,
                f.facility_a,
                date(2024, 4, day).and_hms_opt(10, 0, 0).unwrap(),
                cents,
            );
        }

        let top = top_revenue_days(&f.conn, 2024, 4).unwrap();
        let dates: Vec<NaiveDate> = top.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2024, 4, 2), date(2024, 4, 1), date(2024, 4, 3)]);
        assert_eq!(top[0].total, Decimal::new(1200_00, 2));
    }

    #[test]
    fn top_revenue_days_bounded_to_five_with_earlier_date_winning_ties() {
        let f = fixture();
        for day in 1..=6u32 {
            f.visit(
                f.patient_a,
                f.facility_a,
                date(2024, 4, day).and_hms_opt(10, 0, 0).unwrap(),
                100_00,
            );
        }
        // Another month's invoice stays out of scope
        f.visit(
            f.patient_a,
            f.facility_a,
            date(2024, 5, 1).and_hms_opt(10, 0, 0).unwrap(),
            999_00,
        );

        let top = top_revenue_days(&f.conn, 2024, 4).unwrap();
        assert_eq!(top.len(), 5);
        let dates: Vec<NaiveDate> = top.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            (1..=5u32).map(|d| date(2024, 4, d)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn top_revenue_days_sums_across_insurers() {
        let f = fixture();
        let day = date(2024, 4, 2);
        f.visit(f.patient_a, f.facility_a, day.and_hms_opt(9, 0, 0).unwrap(), 700_00);
        f.visit(f.patient_b, f.facility_a, day.and_hms_opt(10, 0, 0).unwrap(), 500_00);

        let top = top_revenue_days(&f.conn, 2024, 4).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total, Decimal::new(1200_00, 2));
    }

    #[test]
    fn average_revenue_means_per_insurer_within_range() {
        let f = fixture();
        f.visit(f.patient_a, f.facility_a, date(2024, 4, 1).and_hms_opt(9, 0, 0).unwrap(), 100_00);
        f.visit(f.patient_a, f.facility_a, date(2024, 4, 2).and_hms_opt(9, 0, 0).unwrap(), 200_00);
        f.visit(f.patient_b, f.facility_a, date(2024, 4, 1).and_hms_opt(10, 0, 0).unwrap(), 50_01);
        // Outside the range
        f.visit(f.patient_a, f.facility_a, date(2024, 5, 1).and_hms_opt(9, 0, 0).unwrap(), 900_00);

        let averages =
            average_revenue_by_insurer(&f.conn, date(2024, 4, 1), date(2024, 4, 30)).unwrap();
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].insurance_id, f.insurer_a);
        assert_eq!(averages[0].average_revenue, Decimal::new(150_00, 2));
        assert_eq!(averages[1].average_revenue, Decimal::new(50_01, 2));
    }

    #[test]
    fn average_revenue_rounds_to_cents() {
        let f = fixture();
        f.visit(f.patient_a, f.facility_a, date(2024, 4, 1).and_hms_opt(9, 0, 0).unwrap(), 10_00);
        f.visit(f.patient_a, f.facility_a, date(2024, 4, 2).and_hms_opt(9, 0, 0).unwrap(), 10_00);
        f.visit(f.patient_a, f.facility_a, date(2024, 4, 3).and_hms_opt(9, 0, 0).unwrap(), 10_01);

        let averages =
            average_revenue_by_insurer(&f.conn, date(2024, 4, 1), date(2024, 4, 30)).unwrap();
        // 30.01 / 3 = 10.00333..., banker's rounding lands on 10.00
        assert_eq!(averages[0].average_revenue, Decimal::new(10_00, 2));
    }

    #[test]
    fn facility_report_splits_by_facility_and_patient() {
        let f = fixture();
        let day = date(2024, 4, 27);
        f.visit(f.patient_a, f.facility_a, day.and_hms_opt(9, 0, 0).unwrap(), 100_00);
        f.visit(f.patient_b, f.facility_a, day.and_hms_opt(10, 0, 0).unwrap(), 40_00);
        f.visit(f.patient_a, f.facility_b, day.and_hms_opt(14, 0, 0).unwrap(), 300_00);
        // Different date stays out
        f.visit(
            f.patient_a,
            f.facility_a,
            date(2024, 4, 28).and_hms_opt(9, 0, 0).unwrap(),
            999_00,
        );

        let report = revenue_by_facility(&f.conn, day).unwrap();
        assert_eq!(report.grand_total, Decimal::new(440_00, 2));
        assert_eq!(report.facilities.len(), 2);

        let office = &report.facilities[0];
        assert_eq!(office.facility_id, f.facility_a);
        assert_eq!(office.total, Decimal::new(140_00, 2));
        assert_eq!(office.by_patient.len(), 2);
        assert_eq!(office.by_patient[0].patient_id, f.patient_a);
        assert_eq!(office.by_patient[0].total, Decimal::new(100_00, 2));

        let surgery = &report.facilities[1];
        assert_eq!(surgery.total, Decimal::new(300_00, 2));
    }

    #[test]
    fn facility_report_empty_day() {
        let f = fixture();
        let report = revenue_by_facility(&f.conn, date(2024, 4, 27)).unwrap();
        assert!(report.facilities.is_empty());
        assert_eq!(report.grand_total, Decimal::ZERO);
    }

    #[test]
    fn top_revenue_days_invalid_month_is_empty() {
        let f = fixture();
        f.visit(
            f.patient_a,
            f.facility_a,
            date(2024, 4, 1).and_hms_opt(10, 0, 0).unwrap(),
            100_00,
        );
        assert!(top_revenue_days(&f.conn, 2024, 13).unwrap().is_empty());
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        assert_eq!(
            month_bounds(2024, 2),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
        assert_eq!(
            month_bounds(2024, 12),
            Some((date(2024, 12, 1), date(2024, 12, 31)))
        );
        assert_eq!(month_bounds(2024, 13), None);
    }

    #[test]
    fn empty_invoice_excluded_from_daily_report() {
        let f = fixture();
        let day = date(2024, 4, 27);
        find_or_create_invoice(&f.conn, f.insurer_a, day).unwrap();

        let report = daily_invoices_by_insurer(&f.conn, day).unwrap();
        assert!(report.is_empty());

        // But it still counts toward day revenue at zero
        let top = top_revenue_days(&f.conn, 2024, 4).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total, Decimal::ZERO);
    }
}
