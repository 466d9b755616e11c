use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use clap::Args;

use saudapakka::accounts::{KycService, User, UserId, UserRole};
use saudapakka::error::AppError;
use saudapakka::listings::{ListingDraft, ListingService, PropertyId};
use saudapakka::mandates::{
    Attachment, DealType, MandateDraft, MandateError, MandateId, MandateParty, MandateService,
    SignaturePacket,
};

use crate::infra::{
    InMemoryKycRepository, InMemoryListingRepository, InMemoryMandateRepository,
    InMemoryUserDirectory, RecordingNotificationSink, StaticKycProvider,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Run the sweep as of this date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

struct World {
    mandates: Arc<
        MandateService<InMemoryMandateRepository, InMemoryUserDirectory, RecordingNotificationSink>,
    >,
    listings: ListingService<InMemoryListingRepository>,
    kyc: KycService<StaticKycProvider, InMemoryKycRepository, InMemoryUserDirectory>,
    sink: Arc<RecordingNotificationSink>,
    admin: User,
    seller: User,
    broker: User,
    builder: User,
    stale_mandate: MandateId,
    overrun_mandate: MandateId,
    flat_baner: PropertyId,
    plot_wagholi: PropertyId,
}

fn at(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn account(full_name: &str, email: &str, role: UserRole, kyc_verified: bool) -> User {
    User {
        id: UserId::new(),
        email: email.to_string(),
        phone_number: None,
        full_name: full_name.to_string(),
        role,
        kyc_verified,
    }
}

fn packet(label: &str) -> SignaturePacket {
    SignaturePacket {
        signature: Some(Attachment::new(format!("signatures/{label}.png"))),
        selfie: Some(Attachment::new(format!("selfies/{label}.png"))),
    }
}

/// Seed accounts and two mandates whose timers have already run out by
/// `as_of`: one never counter-signed, one active past its validity window.
fn build_world(as_of: NaiveDate) -> Result<World, AppError> {
    let directory = Arc::new(InMemoryUserDirectory::default());
    let sink = Arc::new(RecordingNotificationSink::default());

    let admin = account("Asha Verma", "asha@saudapakka.in", UserRole::Admin, true);
    let seller = account("Ramesh Kumar", "ramesh@example.in", UserRole::Seller, true);
    let broker = account("Priya Shah", "priya@example.in", UserRole::Broker, true);
    let builder = account("Om Patil", "om@sitebuild.in", UserRole::Builder, false);
    for user in [&admin, &seller, &broker, &builder] {
        directory.seed(user.clone());
    }

    let mandates = Arc::new(MandateService::new(
        Arc::new(InMemoryMandateRepository::default()),
        directory.clone(),
        sink.clone(),
    ));
    let listings = ListingService::new(Arc::new(InMemoryListingRepository::default()));
    let kyc = KycService::new(
        Arc::new(StaticKycProvider),
        Arc::new(InMemoryKycRepository::default()),
        directory.clone(),
    );

    let flat_baner = listings
        .submit(
            &seller,
            ListingDraft {
                title: "2BHK near Baner Road".to_string(),
                locality: "Baner".to_string(),
                asking_price: 8_500_000,
            },
            at(as_of - Duration::days(120)),
        )
        .map_err(AppError::from)?
        .id;
    let plot_wagholi = listings
        .submit(
            &seller,
            ListingDraft {
                title: "NA plot in Wagholi".to_string(),
                locality: "Wagholi".to_string(),
                asking_price: 3_200_000,
            },
            at(as_of - Duration::days(30)),
        )
        .map_err(AppError::from)?
        .id;

    // Platform mandate accepted 95 days ago; its validity window has lapsed.
    let overrun = mandates.create(
        &seller.id,
        MandateDraft {
            property_id: flat_baner,
            deal_type: DealType::WithPlatform,
            initiated_by: MandateParty::Seller,
            seller: None,
            broker: None,
            terms: Default::default(),
            packet: packet("ramesh-flat"),
        },
        at(as_of - Duration::days(100)),
    )?;
    let overrun = mandates.accept_and_sign(
        &admin.id,
        &overrun.id,
        packet("asha-flat"),
        at(as_of - Duration::days(95)),
    )?;

    // Broker approach that the seller never signed; the 7-day window is gone.
    let stale = mandates.create(
        &broker.id,
        MandateDraft {
            property_id: plot_wagholi,
            deal_type: DealType::WithBroker,
            initiated_by: MandateParty::Broker,
            seller: Some(seller.id),
            broker: None,
            terms: Default::default(),
            packet: packet("priya-plot"),
        },
        at(as_of - Duration::days(10)),
    )?;

    Ok(World {
        mandates,
        listings,
        kyc,
        sink,
        admin,
        seller,
        broker,
        builder,
        stale_mandate: stale.id,
        overrun_mandate: overrun.id,
        flat_baner,
        plot_wagholi,
    })
}

pub(crate) fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let world = build_world(as_of)?;

    let report = world.mandates.sweep(at(as_of))?;
    println!(
        "{}",
        serde_json::json!({
            "as_of": as_of,
            "pending_expired": report.pending_expired,
            "active_expired": report.active_expired,
        })
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let world = build_world(as_of)?;
    let now = at(as_of);

    println!("SaudaPakka marketplace demo (as of {as_of})");
    println!(
        "\nAccounts: {} (admin), {} (seller), {} (broker), {} (builder, unverified)",
        world.admin.full_name, world.seller.full_name, world.broker.full_name,
        world.builder.full_name
    );

    println!("\n== Listing moderation ==");
    let approved = world
        .listings
        .approve(&world.admin, &world.flat_baner)
        .map_err(AppError::from)?;
    println!("approved: {} ({})", approved.title, approved.status.label());
    let rejected = world
        .listings
        .reject(
            &world.admin,
            &world.plot_wagholi,
            "survey number missing".to_string(),
        )
        .map_err(AppError::from)?;
    println!(
        "rejected: {} ({}: {})",
        rejected.title,
        rejected.status.label(),
        rejected.rejection_reason.as_deref().unwrap_or("")
    );

    println!("\n== KYC gate ==");
    let blocked = world.mandates.create(
        &world.builder.id,
        MandateDraft {
            property_id: PropertyId::new(),
            deal_type: DealType::WithPlatform,
            initiated_by: MandateParty::Seller,
            seller: None,
            broker: None,
            terms: Default::default(),
            packet: packet("om"),
        },
        now,
    );
    match blocked {
        Err(MandateError::KycRequired) => {
            println!("builder blocked before verification: identity check required")
        }
        Err(other) => return Err(other.into()),
        Ok(_) => println!("unexpected: unverified builder opened a mandate"),
    }
    world
        .kyc
        .admin_override(&world.admin, &world.builder.id, now)?;
    println!("admin override applied; builder is now verified");

    println!("\n== Expiry sweep ==");
    let report = world.mandates.sweep(now)?;
    println!(
        "pending expired: {}, active expired: {}",
        report.pending_expired, report.active_expired
    );
    let again = world.mandates.sweep(now)?;
    println!("second pass finds nothing: {} transitions", again.total());
    let stale = world.mandates.get(&world.admin.id, &world.stale_mandate)?;
    println!(
        "unsigned broker approach {} is now {}",
        stale.number,
        stale.status.label()
    );

    println!("\n== Renewal ==");
    let renewed = world.mandates.renew(
        &world.seller.id,
        &world.overrun_mandate,
        packet("ramesh-renewal"),
        now,
    )?;
    println!(
        "renewed {} -> {} ({})",
        world.overrun_mandate.0,
        renewed.number,
        renewed.status.label()
    );
    let active = world
        .mandates
        .accept_and_sign(&world.admin.id, &renewed.id, packet("asha-renewal"), now)?;
    println!(
        "counter-signed: {} runs {} to {}",
        active.number,
        active.start_date.map(|d| d.to_string()).unwrap_or_default(),
        active.end_date.map(|d| d.to_string()).unwrap_or_default()
    );

    println!("\n== Mandate letter ==");
    let letter = world
        .mandates
        .letter(&world.seller.id, &active.id, now)?;
    println!("{}", letter.to_text());

    println!("\n== Ledger (admin view) ==");
    for mandate in world.mandates.list_for(&world.admin.id)? {
        println!(
            "  {} {} {} (property {})",
            mandate.number,
            mandate.status.label(),
            mandate.deal_type.label(),
            mandate.property_id.0
        );
    }

    println!("\nNotifications delivered: {}", world.sink.deliveries().len());
    Ok(())
}
