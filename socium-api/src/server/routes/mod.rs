use crate::server::{Result, ServerError, ServerRouter};
use socium_common::model::Id;
use socium_db::Gateway;

mod accounts;
mod admin;
mod contacts;
mod friends;
mod posts;

pub fn routes<G: Gateway>() -> ServerRouter<G> {
    ServerRouter::new()
        .merge(accounts::routes())
        .merge(friends::routes())
        .merge(posts::routes())
        .merge(admin::routes())
        .merge(contacts::routes())
}

/// Splits a free text search into the tokens the directory understands.
fn search_tokens(filter: &str) -> Vec<&str> {
    filter.split_whitespace().collect()
}

/// Parses a comma separated list of ids, ignoring empty entries.
fn parse_id_list<Marker>(list: &str) -> Result<Vec<Id<Marker>>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(ServerError::InvalidIdList)
}

#[cfg(test)]
mod tests {
    use crate::server::routes::{parse_id_list, search_tokens};
    use socium_common::model::{Id, account::AccountMarker};

    #[test]
    fn id_list() {
        let ids = parse_id_list::<AccountMarker>("1, 2,,3").unwrap();
        assert_eq!(ids, [Id::from(1), Id::from(2), Id::from(3)]);

        assert!(parse_id_list::<AccountMarker>("").unwrap().is_empty());
        assert!(parse_id_list::<AccountMarker>("1,x").is_err());
    }

    #[test]
    fn tokens() {
        assert!(search_tokens("").is_empty());
        assert!(search_tokens("   ").is_empty());
        assert_eq!(search_tokens(" ada  lovelace "), ["ada", "lovelace"]);
    }
}
