//! Parses the attach URL `/ws/rooms/<room_id>/?token=<token>`.

use wager_protocol::RoomId;

/// What a connection asked to attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttachTarget {
    /// `None` when the path is not a room path or the id is not a number.
    pub(crate) room_id: Option<RoomId>,
    /// Empty when the query has no `token` parameter.
    pub(crate) token: String,
}

pub(crate) fn parse(uri: &str) -> AttachTarget {
    let (path, query) = uri.split_once('?').unwrap_or((uri, ""));

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let room_id = match segments.as_slice() {
        ["ws", "rooms", id] => id.parse().ok().map(RoomId),
        _ => None,
    };

    let token = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .unwrap_or_default()
        .to_string();

    AttachTarget { room_id, token }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_attach_url() {
        let target = parse("/ws/rooms/12/?token=abc123");
        assert_eq!(target.room_id, Some(RoomId(12)));
        assert_eq!(target.token, "abc123");
    }

    #[test]
    fn test_parse_without_trailing_slash_or_token() {
        let target = parse("/ws/rooms/7");
        assert_eq!(target.room_id, Some(RoomId(7)));
        assert_eq!(target.token, "");
    }

    #[test]
    fn test_parse_token_among_other_params() {
        let target = parse("/ws/rooms/3/?lang=en&token=t0k");
        assert_eq!(target.token, "t0k");
    }

    #[test]
    fn test_parse_rejects_other_paths() {
        assert_eq!(parse("/ws/rooms/abc/?token=x").room_id, None);
        assert_eq!(parse("/ws/lobby/?token=x").room_id, None);
        assert_eq!(parse("/").room_id, None);
    }
}
