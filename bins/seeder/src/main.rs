//! Database seeder for tuition ledger development and testing.
//!
//! Seeds a location, two courses with a batch each, a few students admitted to
//! the first batch, a director and a bank account, so the API has something to
//! work on locally. Run it against a freshly migrated database.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use tuition_core::ActorContext;
use tuition_db::connect;
use tuition_db::repositories::{
    Admission, BankRepository, CreateBankAccount, DirectoryRepository, EnrollmentRepository,
    NewBatch, NewCourse, NewStudent,
};
use tuition_shared::AppConfig;
use tuition_shared::types::{LocationId, UserId};

const STUDENTS: [(&str, &str); 3] = [
    ("Asha Menon", "asha@example.com"),
    ("Rahul Verma", "rahul@example.com"),
    ("Fatima Khan", "fatima@example.com"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    let tx_timeout = config.ledger.transaction_timeout();

    println!("Connecting to database...");
    let db = connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    let directory = DirectoryRepository::new(db.clone());

    println!("Seeding location...");
    let location = directory.create_location("Main campus").await?;
    let actor = ActorContext::new(UserId::new(), LocationId::from_uuid(location.id));
    println!("  Created location {} ({})", location.name, location.id);

    println!("Seeding courses and batches...");
    let mut batches = Vec::new();
    for (course_name, base_fee, batch_name) in [
        ("JEE Foundation", 30_000, "JEE Morning"),
        ("NEET Crash Course", 40_000, "NEET Evening"),
    ] {
        let course = directory
            .create_course(NewCourse {
                name: course_name.to_string(),
                base_fee,
            })
            .await?;
        let batch = directory
            .create_batch(NewBatch {
                course_id: course.id,
                location_id: location.id,
                name: batch_name.to_string(),
                slot_limit: 30,
            })
            .await?;
        println!("  Created {batch_name} ({}) for {course_name}", batch.id);
        batches.push(batch);
    }

    println!("Seeding students...");
    let enrollment = EnrollmentRepository::new(db.clone(), tx_timeout);
    for (name, email) in STUDENTS {
        let student = directory
            .create_student(NewStudent {
                location_id: location.id,
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: None,
            })
            .await?;
        let admitted = enrollment
            .admit(
                &actor,
                Admission {
                    student_id: student.id,
                    batch_id: batches[0].id,
                    discount_amount: 0,
                    note: Some("seeded".to_string()),
                },
            )
            .await?
            .value;
        println!("  Admitted {name} with fee {}", admitted.fee.id);
    }

    println!("Seeding director and bank account...");
    let director = directory
        .create_director("Meera Iyer", Some("meera@example.com".to_string()))
        .await?;
    println!("  Created director {} ({})", director.name, director.id);
    let account = BankRepository::new(db.clone(), tx_timeout)
        .create_account(CreateBankAccount {
            name: "Current account".to_string(),
            bank_name: Some("State Bank".to_string()),
            account_number: None,
            opening_balance: 100_000,
        })
        .await?
        .value;
    println!("  Created bank account {}", account.id);

    println!("Seeding complete!");
    println!("Use x-actor-id: {} and x-location-id: {}", actor.user_id, location.id);
    Ok(())
}
