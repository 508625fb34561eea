use crate::{Service, error::Result};
use socium_common::{
    geo::Coordinates,
    model::{
        Id,
        account::{Account, AccountMarker, UpdateProfile},
        page::{AccountPage, Page, PageRequest},
    },
    util::timestamp_now,
};
use socium_db::{AccountFilter, Gateway, Window};
use tracing::{debug, info};

pub const NEARBY_RADIUS_KM: f64 = 20.0;

impl<G: Gateway> Service<G> {
    pub async fn get_account(&self, id: Id<AccountMarker>) -> Result<Account> {
        self.fetch_account(id).await
    }

    pub async fn update_profile(
        &self,
        id: Id<AccountMarker>,
        update: UpdateProfile,
    ) -> Result<Account> {
        let mut account = self.fetch_account(id).await?;

        account.description = update.description;
        account.profile_image = update.profile_image;
        account.updated_at = timestamp_now();

        let account = self.replace_account(&account).await?;
        info!(account = %id, "Updated profile");
        Ok(account)
    }

    /// Accounts within `radius_km` of `point`, excluding `exclude`.
    ///
    /// Only locations with a strictly positive latitude and longitude are
    /// considered, which leaves out the southern and western hemispheres as
    /// well as anything on the equator or the prime meridian.
    pub async fn nearby_accounts(
        &self,
        exclude: Id<AccountMarker>,
        point: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<Account>> {
        let accounts = self
            .gateway
            .scan_accounts(&AccountFilter::default(), Window::all())
            .await?;

        let nearby: Vec<_> = accounts
            .into_iter()
            .filter(|account| account.id != exclude)
            .filter(|account| {
                account.location.is_some_and(|location| {
                    location.is_north_east() && location.distance_km(point) <= radius_km
                })
            })
            .collect();

        debug!(%exclude, radius_km, found = nearby.len(), "Searched nearby accounts");
        Ok(nearby)
    }

    /// One page of accounts matching the search tokens. See
    /// [`AccountFilter::from_tokens`] for how tokens are interpreted.
    pub async fn list_accounts<S: AsRef<str> + Sync>(
        &self,
        request: PageRequest,
        tokens: &[S],
    ) -> Result<AccountPage> {
        let filter = AccountFilter::from_tokens(tokens);

        let total_elements = self.gateway.count_accounts(&filter).await?;
        let window = Window {
            skip: request.skip(),
            limit: request.limit(),
        };
        let accounts = self.gateway.scan_accounts(&filter, window).await?;

        Ok(AccountPage {
            accounts,
            page: Page::new(request, total_elements),
        })
    }

    pub async fn search_accounts<S: AsRef<str> + Sync>(&self, tokens: &[S]) -> Result<Vec<Account>> {
        let filter = AccountFilter::from_tokens(tokens);
        let accounts = self.gateway.scan_accounts(&filter, Window::all()).await?;
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        directory::NEARBY_RADIUS_KM,
        testing::{member, place, service},
    };
    use socium_common::{
        geo::Coordinates,
        model::{account::UpdateProfile, page::PageRequest},
    };

    #[tokio::test]
    async fn pagination() {
        let (service, _mails) = service();
        for surname in ["a", "b", "c", "d"] {
            member(&service, "ada", surname).await;
        }
        member(&service, "grace", "hopper").await;

        let page = service
            .list_accounts(PageRequest::new(0, 2), &["ADA"])
            .await
            .unwrap();
        assert_eq!(page.accounts.len(), 2);
        assert_eq!(page.page.total_elements, 4);
        assert_eq!(page.page.total_pages, 2);

        let last = service
            .list_accounts(PageRequest::new(1, 3), &["ada"])
            .await
            .unwrap();
        assert_eq!(last.accounts.len(), 1);
        assert_eq!(last.accounts[0].surname, "d");

        let everything = service
            .list_accounts::<&str>(PageRequest::new(0, 0), &[])
            .await
            .unwrap();
        assert_eq!(everything.accounts.len(), 5);
        assert_eq!(everything.page.total_pages, 1);

        let by_surname = service.search_accounts(&["ad", "c"]).await.unwrap();
        assert_eq!(by_surname.len(), 1);
        assert_eq!(by_surname[0].surname, "c");
    }

    #[tokio::test]
    async fn nearby_search() {
        let (service, _mails) = service();
        let me = member(&service, "ada", "lovelace").await;
        let me = place(&service, &me, 41.0082, 28.9784).await;

        let close = member(&service, "grace", "hopper").await;
        place(&service, &close, 41.0422, 29.0083).await;

        let far = member(&service, "alan", "turing").await;
        place(&service, &far, 39.9334, 32.8597).await;

        let unplaced = member(&service, "edsger", "dijkstra").await;

        let origin = member(&service, "null", "island").await;
        place(&service, &origin, 0.0, 0.0).await;

        let found = service
            .nearby_accounts(me.id, me.location.unwrap(), NEARBY_RADIUS_KM)
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|account| account.id).collect();
        assert_eq!(ids, [close.id]);
        assert!(!ids.contains(&unplaced.id));

        let at_origin = service
            .nearby_accounts(me.id, Coordinates::new(0.0, 0.0).unwrap(), NEARBY_RADIUS_KM)
            .await
            .unwrap();
        assert!(at_origin.is_empty());
    }

    #[tokio::test]
    async fn other_hemispheres_are_never_near() {
        let (service, _mails) = service();
        let me = member(&service, "ada", "lovelace").await;

        let sydney = member(&service, "grace", "hopper").await;
        let sydney = place(&service, &sydney, -33.87, 151.21).await;

        let new_york = member(&service, "alan", "turing").await;
        let new_york = place(&service, &new_york, 40.71, -74.0).await;

        for point in [sydney.location.unwrap(), new_york.location.unwrap()] {
            let found = service
                .nearby_accounts(me.id, point, NEARBY_RADIUS_KM)
                .await
                .unwrap();
            assert!(found.is_empty(), "{point:?}: {found:?}");
        }
    }

    #[tokio::test]
    async fn radius_is_inclusive() {
        let (service, _mails) = service();
        let me = member(&service, "ada", "lovelace").await;
        let origin = Coordinates::new(41.0, 29.0).unwrap();

        // one degree of latitude is roughly 111.2 km
        let inside = member(&service, "grace", "hopper").await;
        let inside = place(&service, &inside, 41.179, 29.0).await;

        let outside = member(&service, "alan", "turing").await;
        place(&service, &outside, 41.181, 29.0).await;

        let found = service
            .nearby_accounts(me.id, origin, NEARBY_RADIUS_KM)
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|account| account.id).collect();
        assert_eq!(ids, [inside.id]);

        let edge = inside.location.unwrap().distance_km(origin);
        assert!(edge < NEARBY_RADIUS_KM);
        let at_edge = service.nearby_accounts(me.id, origin, edge).await.unwrap();
        assert_eq!(at_edge.len(), 1);
        let short = service
            .nearby_accounts(me.id, origin, edge - 1e-6)
            .await
            .unwrap();
        assert!(short.is_empty());
    }

    #[tokio::test]
    async fn profile_update() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;

        let updated = service
            .update_profile(ada.id, UpdateProfile {
                description: "first programmer".to_owned(),
                profile_image: "ada.png".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(updated.description, "first programmer");
        assert_eq!(service.get_account(ada.id).await.unwrap(), updated);
    }
}
