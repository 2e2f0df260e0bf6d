// Well-known WS method and event names.

// handshake
pub const CONNECT: &str = "connect";
pub const PING: &str = "ping";

// wishes
pub const WISHES_SUBMIT: &str = "wishes.submit";
pub const WISHES_LIST: &str = "wishes.list";
pub const WISHES_DELETE: &str = "wishes.delete";
pub const WISHES_CLEAR: &str = "wishes.clear";
pub const WISHES_SEARCH: &str = "wishes.search";
pub const WISHES_EXPORT: &str = "wishes.export";

// spotlight
pub const SPOTLIGHT_TRIGGER: &str = "spotlight.trigger";
pub const SPOTLIGHT_CURRENT: &str = "spotlight.current";

// stage
pub const STAGE_NEXT: &str = "stage.next";
pub const STAGE_PREV: &str = "stage.prev";
pub const STAGE_CURRENT: &str = "stage.current";

// likes
pub const LIKES_GET: &str = "likes.get";
pub const LIKES_TOGGLE: &str = "likes.toggle";

// admin
pub const ADMIN_LOGOUT: &str = "admin.logout";

/// Methods that only an authenticated admin connection may call.
pub const ADMIN_ONLY: &[&str] = &[
    WISHES_DELETE,
    WISHES_CLEAR,
    WISHES_SEARCH,
    WISHES_EXPORT,
    SPOTLIGHT_TRIGGER,
    ADMIN_LOGOUT,
];

pub fn is_admin_only(method: &str) -> bool {
    ADMIN_ONLY.contains(&method)
}

// server → client events
pub const EV_CHALLENGE: &str = "connect.challenge";
pub const EV_SNAPSHOT: &str = "wishes.snapshot";
pub const EV_SPOTLIGHT: &str = "spotlight";
pub const EV_SPOTLIGHT_EXITING: &str = "spotlight.exiting";
pub const EV_SPOTLIGHT_CLEARED: &str = "spotlight.cleared";
pub const EV_STAGE_FRAME: &str = "stage.frame";
pub const EV_LIKES: &str = "likes";
pub const EV_TICK: &str = "tick";
