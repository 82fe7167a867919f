use chrono::Utc;
use model::{
    loyalty::{LoyaltyAccount, LoyaltyReward, Redemption},
    notification::NotificationKind,
    user::Role,
    WithId,
};
use utility::id::Id;

use super::{notify, Actor, Client};
use crate::{
    database::{Database, DatabaseTransaction, LoyaltyRepo, Repo},
    RequestError, RequestResult,
};

pub const NOT_ENOUGH_POINTS: &str = "Points insuffisants";
pub const REWARD_UNAVAILABLE: &str = "Cette récompense n'est plus disponible";

impl<D> Client<D>
where
    D: Database,
{
    pub async fn loyalty_account(&self, actor: &Actor) -> RequestResult<LoyaltyAccount> {
        actor.require(&[Role::Client])?;
        let mut auto = self.database.auto().await?;
        let points = auto.loyalty_points(&actor.id()).await?;
        let redemptions = auto.redemptions(&actor.id()).await?;
        Ok(LoyaltyAccount::new(points, redemptions))
    }

    pub async fn redeem_reward(
        &self,
        actor: &Actor,
        id: &Id<LoyaltyReward>,
    ) -> RequestResult<LoyaltyAccount> {
        actor.require(&[Role::Client])?;
        let mut tx = self.database.transaction().await?;
        let reward: WithId<LoyaltyReward> = tx.get(id).await?;
        if !reward.content.active {
            return Err(RequestError::conflict(REWARD_UNAVAILABLE));
        }
        let points = tx
            .spend_loyalty_points(&actor.id(), reward.content.points_cost)
            .await?
            .ok_or_else(|| RequestError::conflict(NOT_ENOUGH_POINTS))?;
        tx.insert_redemption(Redemption {
            user_id: actor.id(),
            reward_id: reward.id,
            points_spent: reward.content.points_cost,
            created_at: Utc::now(),
        })
        .await?;
        notify(
            &mut tx,
            &actor.id(),
            NotificationKind::RewardRedeemed,
            "Récompense obtenue",
            format!(
                "Vous avez échangé {} points contre « {} ».",
                reward.content.points_cost, reward.content.name
            ),
        )
        .await?;
        let redemptions = tx.redemptions(&actor.id()).await?;
        tx.commit().await?;
        log::info!("user {} redeemed reward {}", actor.id(), reward.id);
        Ok(LoyaltyAccount::new(points, redemptions))
    }
}

#[cfg(test)]
mod tests {
    use model::{booking::BookingForm, loyalty::LoyaltyTier, ExampleData};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::client::testing;

    #[tokio::test]
    async fn new_clients_start_at_bronze() {
        let client = testing::client();
        let customer = testing::customer(&client, "awa@example.sn").await;
        let account = client.loyalty_account(&customer).await.unwrap();
        assert_eq!(account.points, 0);
        assert_eq!(account.tier, LoyaltyTier::Bronze);
        assert_eq!(account.points_to_next_tier, Some(500));
        assert!(account.redemptions.is_empty());
    }

    #[tokio::test]
    async fn redeeming_spends_points() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let reward = client
            .create_reward(&admin, LoyaltyReward::example_data())
            .await
            .unwrap();

        let result = client.redeem_reward(&customer, &reward.id).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == NOT_ENOUGH_POINTS));

        let trip = testing::trip(&client, &patron, 30).await;
        client
            .book(
                &customer,
                BookingForm {
                    trip_id: trip.id,
                    seats: 5,
                    passenger_name: None,
                    passenger_phone: None,
                },
            )
            .await
            .unwrap();
        let account = client.redeem_reward(&customer, &reward.id).await.unwrap();
        assert_eq!(account.points, 375 - 300);
        assert_eq!(account.redemptions.len(), 1);
        assert_eq!(account.redemptions[0].content.points_spent, 300);
        assert_eq!(
            client.notifications(&customer, false).await.unwrap()[0].content.kind,
            NotificationKind::RewardRedeemed
        );
    }

    #[tokio::test]
    async fn points_are_only_spent_once() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let (patron, _) = testing::patron(&client, "patron@example.sn").await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let reward = client
            .create_reward(
                &admin,
                LoyaltyReward {
                    points_cost: 375,
                    ..LoyaltyReward::example_data()
                },
            )
            .await
            .unwrap();
        let trip = testing::trip(&client, &patron, 30).await;
        client
            .book(
                &customer,
                BookingForm {
                    trip_id: trip.id,
                    seats: 5,
                    passenger_name: None,
                    passenger_phone: None,
                },
            )
            .await
            .unwrap();

        let account = client.redeem_reward(&customer, &reward.id).await.unwrap();
        assert_eq!(account.points, 0);
        let again = client.redeem_reward(&customer, &reward.id).await;
        assert!(matches!(again, Err(RequestError::Conflict(message)) if message == NOT_ENOUGH_POINTS));

        let account = client.loyalty_account(&customer).await.unwrap();
        assert_eq!(account.points, 0);
        assert_eq!(account.redemptions.len(), 1);
    }

    #[tokio::test]
    async fn inactive_rewards_can_not_be_redeemed() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let reward = client
            .create_reward(
                &admin,
                LoyaltyReward {
                    active: false,
                    ..LoyaltyReward::example_data()
                },
            )
            .await
            .unwrap();
        assert!(client.rewards(&customer).await.unwrap().is_empty());
        assert!(matches!(
            client.redeem_reward(&customer, &reward.id).await,
            Err(RequestError::Conflict(message)) if message == REWARD_UNAVAILABLE
        ));
    }
}
