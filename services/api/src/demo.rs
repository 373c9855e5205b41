use crate::infra::{build_ppm_service, ApiService};
use chrono::{Local, NaiveDate};
use clap::Args;
use ppm_shipments::config::AppConfig;
use ppm_shipments::error::AppError;
use ppm_shipments::workflows::ppm::{
    Address, CertificationSubmission, Cents, Document, MoveStatus, MovingExpense,
    MovingExpenseType, PpmDocumentId, PpmDocumentStatus, PpmShipment, Pounds, ServiceError, Shipment,
    ShipmentId, ShipmentStatus, ShipmentType, Upload, WeightTicket,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Expected departure date (YYYY-MM-DD). Defaults to 30 days from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) departure: Option<NaiveDate>,
    /// Estimated weight of the move in pounds.
    #[arg(long, default_value_t = 5_000)]
    pub(crate) weight: i64,
    /// Request an advance of this many cents after the incentive is estimated.
    #[arg(long)]
    pub(crate) advance: Option<i64>,
    /// Reject the weight ticket on the first counselor review.
    #[arg(long)]
    pub(crate) reject_first_review: bool,
    /// Print the final record as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        departure,
        weight,
        advance,
        reject_first_review,
        json,
    } = args;

    let config = AppConfig::load()?;
    let today = Local::now().date_naive();
    let departure = departure.unwrap_or_else(|| today + chrono::Duration::days(30));
    let (service, _store) = build_ppm_service(&config.ppm);

    println!("PPM shipment lifecycle demo");
    println!(
        "- Advance cap {}% | base {} cents | {} cents per pound",
        config.ppm.advance_cap_percent,
        config.ppm.incentive_base_cents,
        config.ppm.incentive_cents_per_pound
    );

    let mut ppm = service.create_with_default_checks(demo_shipment(departure, weight))?;
    report("Created", &ppm);

    if let Some(amount) = advance {
        ppm = update(
            &service,
            &ppm,
            PpmShipment {
                has_requested_advance: Some(true),
                advance_amount_requested: Some(Cents(amount)),
                ..PpmShipment::default()
            },
        )?;
        println!("  Advance requested: {amount} cents");
    }

    let id = ppm.id.ok_or_else(missing_field("id"))?;
    ppm = service.submit(id, &version(&ppm)?)?;
    report("Submitted", &ppm);
    ppm = service.send_to_customer(id, &version(&ppm)?)?;
    report("Approved for the customer", &ppm);

    let first_review = if reject_first_review {
        Some(PpmDocumentStatus::Rejected)
    } else {
        Some(PpmDocumentStatus::Approved)
    };
    ppm = update(
        &service,
        &ppm,
        PpmShipment {
            actual_move_date: Some(today.min(departure)),
            weight_tickets: vec![demo_weight_ticket(weight, first_review)],
            moving_expenses: vec![demo_expense()],
            ..PpmShipment::default()
        },
    )?;

    ppm = service.submit_close_out_documentation(id, &version(&ppm)?, customer_signature())?;
    report("Close-out submitted", &ppm);
    ppm = service.submit_reviewed_documents(id, counselor_signature())?;
    report("Documents reviewed", &ppm);

    if ppm.has_rejected_documents() {
        let mut corrected = ppm.weight_tickets.clone();
        for ticket in &mut corrected {
            ticket.status = Some(PpmDocumentStatus::Approved);
            ticket.reason = None;
        }
        ppm = update(
            &service,
            &ppm,
            PpmShipment {
                weight_tickets: corrected,
                ..PpmShipment::default()
            },
        )?;
        ppm =
            service.submit_close_out_documentation(id, &version(&ppm)?, customer_signature())?;
        report("Close-out resubmitted", &ppm);
        ppm = service.submit_reviewed_documents(id, counselor_signature())?;
        report("Documents reviewed again", &ppm);
    }

    if json {
        match serde_json::to_string_pretty(&ppm) {
            Ok(json) => println!("\nFinal record:\n{json}"),
            Err(err) => println!("\nFinal record unavailable: {err}"),
        }
    }

    Ok(())
}

fn report(step: &str, ppm: &PpmShipment) {
    let status = ppm
        .status
        .map(|status| status.label())
        .unwrap_or("New");
    let incentive = ppm
        .estimated_incentive
        .map(|cents| format!("{} cents", cents.0))
        .unwrap_or_else(|| "not estimated".to_string());
    println!("- {step}: status {status} | estimated incentive {incentive}");
}

fn missing_field(field: &'static str) -> impl FnOnce() -> AppError {
    move || {
        AppError::Service(ServiceError::BadData(format!(
            "persisted record is missing its {field}"
        )))
    }
}

fn version(ppm: &PpmShipment) -> Result<String, AppError> {
    ppm.etag().ok_or_else(missing_field("version token"))
}

fn update(
    service: &ApiService,
    ppm: &PpmShipment,
    changes: PpmShipment,
) -> Result<PpmShipment, AppError> {
    let shipment_id = ppm.shipment_id.ok_or_else(missing_field("shipment id"))?;
    Ok(service.update_with_default_checks(changes, shipment_id, &version(ppm)?)?)
}

fn address(street: &str, city: &str, state: &str, postal_code: &str) -> Address {
    Address {
        id: None,
        street_address_1: street.to_string(),
        street_address_2: None,
        street_address_3: None,
        city: city.to_string(),
        state: state.to_string(),
        postal_code: postal_code.to_string(),
    }
}

fn demo_shipment(departure: NaiveDate, weight: i64) -> PpmShipment {
    let shipment_id = ShipmentId::new();
    PpmShipment {
        shipment_id: Some(shipment_id),
        shipment: Shipment {
            id: Some(shipment_id),
            shipment_type: Some(ShipmentType::Ppm),
            status: Some(ShipmentStatus::Draft),
            approved_date: None,
            move_status: Some(MoveStatus::Draft),
        },
        expected_departure_date: Some(departure),
        pickup_address: Some(address("4100 Gibson Blvd", "Albuquerque", "NM", "87117")),
        has_secondary_pickup_address: Some(false),
        destination_address: Some(address("1 Bong St", "Anchorage", "AK", "99506")),
        has_secondary_destination_address: Some(false),
        sit_expected: Some(false),
        estimated_weight: Some(Pounds(weight)),
        has_pro_gear: Some(false),
        ..PpmShipment::default()
    }
}

fn scanned(filename: &str) -> Document {
    let mut document = Document::new();
    document.uploads.push(Upload {
        id: uuid::Uuid::new_v4(),
        filename: filename.to_string(),
        deleted_at: None,
    });
    document
}

fn demo_weight_ticket(weight: i64, status: Option<PpmDocumentStatus>) -> WeightTicket {
    WeightTicket {
        id: PpmDocumentId::new(),
        vehicle_description: Some("Rental truck".to_string()),
        empty_weight: Some(Pounds(10_000)),
        full_weight: Some(Pounds(10_000 + weight)),
        empty_document: scanned("empty-scale.jpg"),
        full_document: scanned("full-scale.jpg"),
        proof_of_trailer_ownership_document: Document::new(),
        status,
        reason: (status == Some(PpmDocumentStatus::Rejected))
            .then(|| "Scale ticket is not legible".to_string()),
        deleted_at: None,
    }
}

fn demo_expense() -> MovingExpense {
    MovingExpense {
        id: PpmDocumentId::new(),
        expense_type: Some(MovingExpenseType::PackingMaterials),
        description: Some("Boxes and tape".to_string()),
        amount: Some(Cents(8_450)),
        paid_with_gtcc: Some(false),
        document: scanned("packing-receipt.pdf"),
        status: Some(PpmDocumentStatus::Approved),
        reason: None,
        deleted_at: None,
    }
}

fn customer_signature() -> CertificationSubmission {
    CertificationSubmission {
        certification_text: "I certify that the close-out documents are accurate.".to_string(),
        signature: "Sam Ortiz".to_string(),
    }
}

fn counselor_signature() -> CertificationSubmission {
    CertificationSubmission {
        certification_text: "Documents reviewed against the submitted receipts.".to_string(),
        signature: "Counselor Lee".to_string(),
    }
}
