//! services/api/src/seed.rs
//!
//! Starter reward catalog, written at startup when `SEED_DATA` is set and the
//! catalog collections are still empty.

use std::collections::BTreeMap;

use study_shield_core::{
    Challenge, ChallengeType, EntityStore, Milestone, PortResult, ProgressUnit, ShopItem,
    TierName, TierRequirement,
};
use tracing::info;
use uuid::Uuid;

/// What a seeding pass wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub challenges: usize,
    pub milestones: usize,
    pub shop_items: usize,
}

fn starter_challenges() -> Vec<Challenge> {
    vec![
        Challenge {
            id: Uuid::new_v4(),
            title: "Study Marathon".to_string(),
            description: "Study for 2 hours in a single day".to_string(),
            coins: 30,
            goal: 120,
            challenge_type: ChallengeType::Daily,
            is_limited: false,
            expires_in: None,
        },
        Challenge {
            id: Uuid::new_v4(),
            title: "Subject Explorer".to_string(),
            description: "Study 3 different subjects this week".to_string(),
            coins: 40,
            goal: 3,
            challenge_type: ChallengeType::Special,
            is_limited: true,
            expires_in: Some(7),
        },
    ]
}

fn starter_milestones() -> Vec<Milestone> {
    let tiers = BTreeMap::from([
        (TierName::Bronze, TierRequirement { value: 25, coins: 75 }),
        (TierName::Silver, TierRequirement { value: 50, coins: 150 }),
        (TierName::Gold, TierRequirement { value: 100, coins: 300 }),
        (TierName::Platinum, TierRequirement { value: 250, coins: 500 }),
    ]);
    vec![Milestone {
        id: Uuid::new_v4(),
        title: "Distraction Defender".to_string(),
        description: "Block distracting websites during study sessions".to_string(),
        tiers,
        progress_unit: ProgressUnit::Blocks,
    }]
}

fn starter_shop_items() -> Vec<ShopItem> {
    vec![
        ShopItem {
            id: Uuid::new_v4(),
            title: "Study Planner Template".to_string(),
            description: Some("A printable weekly planner".to_string()),
            price: 45,
            image_url: "/images/shop/planner.png".to_string(),
            category: Some("templates".to_string()),
            is_featured: true,
        },
        ShopItem {
            id: Uuid::new_v4(),
            title: "Focus Badge Pack".to_string(),
            description: Some("Profile badges for focused streaks".to_string()),
            price: 25,
            image_url: "/images/shop/badges.png".to_string(),
            category: Some("badges".to_string()),
            is_featured: false,
        },
    ]
}

/// Seeds each catalog collection that is empty; populated ones are left alone.
pub async fn seed_catalog(store: &dyn EntityStore) -> PortResult<SeedReport> {
    let mut report = SeedReport::default();

    if store.list_challenges(None).await?.is_empty() {
        for challenge in starter_challenges() {
            store.insert_challenge(&challenge).await?;
            report.challenges += 1;
        }
    }
    if store.list_milestones().await?.is_empty() {
        for milestone in starter_milestones() {
            store.insert_milestone(&milestone).await?;
            report.milestones += 1;
        }
    }
    if store.list_shop_items().await?.is_empty() {
        for item in starter_shop_items() {
            store.insert_shop_item(&item).await?;
            report.shop_items += 1;
        }
    }

    info!(
        challenges = report.challenges,
        milestones = report.milestones,
        shop_items = report.shop_items,
        "Catalog seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_shield_core::InMemoryStore;

    #[tokio::test]
    async fn seeds_empty_collections_once() {
        let store = InMemoryStore::new();

        let first = seed_catalog(&store).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                challenges: 2,
                milestones: 1,
                shop_items: 2
            }
        );

        let second = seed_catalog(&store).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.list_challenges(Some(ChallengeType::Daily)).await.unwrap().len(), 1);
    }

    #[test]
    fn milestone_ladder_is_ascending() {
        let milestone = &starter_milestones()[0];
        let values: Vec<i64> = milestone.tiers.values().map(|t| t.value).collect();
        assert_eq!(values, vec![25, 50, 100, 250]);
    }
}
