//! Friend requests and the symmetric friend graph.
//!
//! Updates touching two accounts are not transactional. The first record is
//! written, then the second; when the second write fails the first record is
//! put back to its snapshot and the caller gets [`ServiceError::PartialWrite`].

use crate::{
    Service,
    error::{Result, ServiceError},
};
use socium_common::{
    model::{
        Id,
        account::{Account, AccountMarker},
    },
    util::{push_unique, remove_element, timestamp_now},
};
use socium_db::Gateway;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

impl<G: Gateway> Service<G> {
    /// Records `requester` as pending on `target`. Repeating a request or
    /// requesting an existing friend changes nothing.
    pub async fn send_friend_request(
        &self,
        target: Id<AccountMarker>,
        requester: Id<AccountMarker>,
    ) -> Result<Account> {
        if target == requester {
            return Err(ServiceError::SelfFriendRequest(target));
        }

        let mut account = self.fetch_account(target).await?;

        if account.friend_ids.contains(&requester)
            || !push_unique(&mut account.friend_request_ids, requester)
        {
            debug!(%target, %requester, "Friend request already present");
            return Ok(account);
        }

        account.updated_at = timestamp_now();
        let account = self.replace_account(&account).await?;
        info!(%target, %requester, "Sent friend request");
        Ok(account)
    }

    /// Pending requesters of `account`, oldest request first.
    pub async fn list_incoming_friend_requests(
        &self,
        account: Id<AccountMarker>,
    ) -> Result<Vec<Account>> {
        let account = self.fetch_account(account).await?;
        self.fetch_accounts_in_order(&account.friend_request_ids)
            .await
    }

    pub async fn resolve_friend_request(
        &self,
        account: Id<AccountMarker>,
        requester: Id<AccountMarker>,
        accept: bool,
    ) -> Result<Account> {
        let before = self.fetch_account(account).await?;
        let mut requesting = self.fetch_account(requester).await?;

        let mut resolved = before.clone();
        if !remove_element(&mut resolved.friend_request_ids, &requester) {
            return Err(ServiceError::FriendRequestNotFound { account, requester });
        }

        let now = timestamp_now();
        resolved.updated_at = now;

        if !accept {
            let resolved = self.replace_account(&resolved).await?;
            info!(%account, %requester, "Declined friend request");
            return Ok(resolved);
        }

        push_unique(&mut resolved.friend_ids, requester);
        push_unique(&mut requesting.friend_ids, account);
        remove_element(&mut requesting.friend_request_ids, &account);
        requesting.updated_at = now;

        let resolved = self.write_pair(&before, &resolved, &requesting).await?;
        info!(%account, %requester, "Accepted friend request");
        Ok(resolved)
    }

    /// Friends of `account` in the order they were added.
    pub async fn list_friends(&self, account: Id<AccountMarker>) -> Result<Vec<Account>> {
        let account = self.fetch_account(account).await?;
        self.fetch_accounts_in_order(&account.friend_ids).await
    }

    pub async fn unfriend(
        &self,
        account: Id<AccountMarker>,
        friend: Id<AccountMarker>,
    ) -> Result<Account> {
        let before = self.fetch_account(account).await?;
        let mut former_friend = self.fetch_account(friend).await?;

        let mut updated = before.clone();
        let removed = remove_element(&mut updated.friend_ids, &friend)
            | remove_element(&mut former_friend.friend_ids, &account);

        if !removed {
            debug!(%account, %friend, "Accounts were not friends");
            return Ok(before);
        }

        let now = timestamp_now();
        updated.updated_at = now;
        former_friend.updated_at = now;

        let updated = self.write_pair(&before, &updated, &former_friend).await?;
        info!(%account, %friend, "Removed friendship");
        Ok(updated)
    }

    /// Resolves `ids` keeping their order. Ids that no longer resolve are
    /// skipped.
    pub(crate) async fn fetch_accounts_in_order(
        &self,
        ids: &[Id<AccountMarker>],
    ) -> Result<Vec<Account>> {
        let mut by_id: HashMap<_, _> = self
            .gateway
            .fetch_accounts(ids)
            .await?
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        let accounts = ids
            .iter()
            .filter_map(|id| {
                let account = by_id.remove(id);
                if account.is_none() {
                    debug!(account = %id, "Skipping unresolvable account reference");
                }
                account
            })
            .collect();
        Ok(accounts)
    }

    async fn write_pair(
        &self,
        snapshot: &Account,
        first: &Account,
        second: &Account,
    ) -> Result<Account> {
        let written = self.replace_account(first).await?;

        match self.gateway.replace_account(second).await {
            Ok(Some(_)) => Ok(written),
            Ok(None) => {
                self.roll_back(snapshot).await;
                Err(ServiceError::AccountNotFound(second.id))
            }
            Err(source) => {
                let rolled_back = self.roll_back(snapshot).await;
                Err(ServiceError::PartialWrite {
                    account: first.id,
                    counterpart: second.id,
                    rolled_back,
                    source,
                })
            }
        }
    }

    async fn roll_back(&self, snapshot: &Account) -> bool {
        match self.gateway.replace_account(snapshot).await {
            Ok(Some(_)) => {
                warn!(account = %snapshot.id, "Rolled back account after failed pair write");
                true
            }
            Ok(None) => {
                error!(account = %snapshot.id, "Account vanished during rollback");
                false
            }
            Err(error) => {
                error!(account = %snapshot.id, %error, "Rolling back account failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{ErrorKind, ServiceError},
        testing::{member, service},
    };
    use socium_common::model::Id;
    use socium_db::Gateway;

    #[tokio::test]
    async fn accept_is_symmetric() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        let pending = service.send_friend_request(ada.id, grace.id).await.unwrap();
        assert_eq!(pending.friend_request_ids, [grace.id]);

        let ada = service
            .resolve_friend_request(ada.id, grace.id, true)
            .await
            .unwrap();
        assert!(ada.friend_request_ids.is_empty());
        assert_eq!(ada.friend_ids, [grace.id]);

        let grace = service.gateway().fetch_account(grace.id).await.unwrap().unwrap();
        assert_eq!(grace.friend_ids, [ada.id]);

        let friends = service.list_friends(grace.id).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].id, ada.id);
    }

    #[tokio::test]
    async fn send_is_idempotent() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        service.send_friend_request(ada.id, grace.id).await.unwrap();
        let again = service.send_friend_request(ada.id, grace.id).await.unwrap();
        assert_eq!(again.friend_request_ids, [grace.id]);
    }

    #[tokio::test]
    async fn request_between_friends_is_ignored() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        service.send_friend_request(ada.id, grace.id).await.unwrap();
        service
            .resolve_friend_request(ada.id, grace.id, true)
            .await
            .unwrap();

        let grace = service.send_friend_request(grace.id, ada.id).await.unwrap();
        assert!(grace.friend_request_ids.is_empty());
    }

    #[tokio::test]
    async fn self_request_is_rejected() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;

        let error = service.send_friend_request(ada.id, ada.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn missing_target() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;

        let error = service
            .send_friend_request(Id::from(7), ada.id)
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::AccountNotFound(id) if id == Id::from(7)));
    }

    #[tokio::test]
    async fn decline_does_not_befriend() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        service.send_friend_request(ada.id, grace.id).await.unwrap();
        let ada = service
            .resolve_friend_request(ada.id, grace.id, false)
            .await
            .unwrap();
        assert!(ada.friend_request_ids.is_empty());
        assert!(ada.friend_ids.is_empty());

        let grace = service.gateway().fetch_account(grace.id).await.unwrap().unwrap();
        assert!(grace.friend_ids.is_empty());
    }

    #[tokio::test]
    async fn resolving_requires_pending_request() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        let error = service
            .resolve_friend_request(ada.id, grace.id, true)
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::FriendRequestNotFound { .. }));
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn incoming_requests_keep_request_order() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;
        let alan = member(&service, "alan", "turing").await;
        let edsger = member(&service, "edsger", "dijkstra").await;

        for requester in [&edsger, &grace, &alan] {
            service
                .send_friend_request(ada.id, requester.id)
                .await
                .unwrap();
        }

        let names: Vec<String> = service
            .list_incoming_friend_requests(ada.id)
            .await
            .unwrap()
            .into_iter()
            .map(|account| account.name)
            .collect();
        assert_eq!(names, ["edsger", "grace", "alan"]);
    }

    #[tokio::test]
    async fn unfriend_is_symmetric() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        service.send_friend_request(ada.id, grace.id).await.unwrap();
        service
            .resolve_friend_request(ada.id, grace.id, true)
            .await
            .unwrap();

        let grace = service.unfriend(grace.id, ada.id).await.unwrap();
        assert!(grace.friend_ids.is_empty());

        let ada = service.gateway().fetch_account(ada.id).await.unwrap().unwrap();
        assert!(ada.friend_ids.is_empty());
    }

    #[tokio::test]
    async fn failed_second_write_is_rolled_back() {
        let (service, _mails) = service();
        let ada = member(&service, "ada", "lovelace").await;
        let grace = member(&service, "grace", "hopper").await;

        let pending = service.send_friend_request(ada.id, grace.id).await.unwrap();
        service.gateway().fail_account_writes(grace.id);

        let error = service
            .resolve_friend_request(ada.id, grace.id, true)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ServiceError::PartialWrite {
                rolled_back: true,
                ..
            }
        ));
        assert_eq!(error.kind(), ErrorKind::PartialWrite);

        let ada = service.gateway().fetch_account(ada.id).await.unwrap().unwrap();
        assert_eq!(ada, pending);
        assert_eq!(ada.friend_request_ids, [grace.id]);
        assert!(ada.friend_ids.is_empty());
    }
}
