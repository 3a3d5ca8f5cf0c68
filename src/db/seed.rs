use super::Db;
use crate::errors::{AppError, Result};
use crate::models::NewContentItem;

/// Ids created by [`Db::seed`], printed by the CLI so the operator can point
/// `DEFAULT_CONTENT_OWNER` at the catalogue user.
#[derive(Debug)]
pub struct SeedSummary {
    pub catalogue_owner_id: i64,
    pub therapist_id: i64,
    pub patient_id: i64,
    pub content_items: usize,
}

const CATALOGUE_EMAIL: &str = "catalogue@logotask.dev";

// (text, counterpart, tag). Enough items to generate every task kind from
// the catalogue pool straight after seeding.
const STARTER_POOL: &[(&str, &str, &str)] = &[
    ("dog", "images/dog.png", "animals"),
    ("cat", "images/cat.png", "animals"),
    ("horse", "images/horse.png", "animals"),
    ("cow", "images/cow.png", "animals"),
    ("sheep", "images/sheep.png", "animals"),
    ("pig", "images/pig.png", "animals"),
    ("duck", "images/duck.png", "animals"),
    ("rabbit", "images/rabbit.png", "animals"),
    ("fox", "images/fox.png", "animals"),
    ("bear", "images/bear.png", "animals"),
    ("apple", "images/apple.png", "food"),
    ("bread", "images/bread.png", "food"),
    ("cheese", "images/cheese.png", "food"),
    ("banana", "images/banana.png", "food"),
    ("tomato", "images/tomato.png", "food"),
    ("carrot", "images/carrot.png", "food"),
    ("egg", "images/egg.png", "food"),
    ("milk", "images/milk.png", "food"),
    ("orange", "images/orange.png", "food"),
    ("potato", "images/potato.png", "food"),
    ("chair", "images/chair.png", "household"),
    ("table", "images/table.png", "household"),
    ("lamp", "images/lamp.png", "household"),
    ("bed", "images/bed.png", "household"),
    ("door", "images/door.png", "household"),
    ("window", "images/window.png", "household"),
    ("spoon", "images/spoon.png", "household"),
    ("cup", "images/cup.png", "household"),
    ("clock", "images/clock.png", "household"),
    ("mirror", "images/mirror.png", "household"),
    ("shirt", "images/shirt.png", "clothing"),
    ("shoe", "images/shoe.png", "clothing"),
    ("hat", "images/hat.png", "clothing"),
    ("sock", "images/sock.png", "clothing"),
    ("coat", "images/coat.png", "clothing"),
    ("glove", "images/glove.png", "clothing"),
    ("scarf", "images/scarf.png", "clothing"),
    ("belt", "images/belt.png", "clothing"),
    ("hand", "images/hand.png", "body"),
    ("foot", "images/foot.png", "body"),
    ("eye", "images/eye.png", "body"),
    ("ear", "images/ear.png", "body"),
    ("nose", "images/nose.png", "body"),
    ("mouth", "images/mouth.png", "body"),
];

impl Db {
    /// Populate a fresh database with the shared catalogue pool and a demo
    /// therapist/patient pair, already linked and active.
    pub async fn seed(&self) -> Result<SeedSummary> {
        if self.email_exists(CATALOGUE_EMAIL).await? {
            return Err(AppError::Validation(
                "database already contains seed data".into(),
            ));
        }

        let catalogue = self
            .create_therapist(CATALOGUE_EMAIL, "Logotask Catalogue")
            .await?;
        let therapist = self
            .create_therapist("demo.therapist@logotask.dev", "Demo Therapist")
            .await?;
        let patient = self
            .create_patient("demo.patient@logotask.dev", "Demo Patient")
            .await?;
        self.set_pending_link(patient.id, therapist.id).await?;
        self.activate_link(patient.id).await?;

        let items: Vec<NewContentItem> = STARTER_POOL
            .iter()
            .map(|(text, counterpart, tag)| NewContentItem {
                text: (*text).to_string(),
                counterpart: (*counterpart).to_string(),
                tags: vec![(*tag).to_string()],
            })
            .collect();
        let content_items = self.import_content(catalogue.id, &items).await?;

        tracing::info!(
            "seed data inserted: catalogue owner {}, {content_items} content items",
            catalogue.id
        );

        Ok(SeedSummary {
            catalogue_owner_id: catalogue.id,
            therapist_id: therapist.id,
            patient_id: patient.id,
            content_items,
        })
    }
}
