use crate::gate::{SettingsUpdate, settings::CategoryId};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeSet;

pub const CMD_SETTINGS: &str = "settings";
pub const CMD_SHOW: &str = "show";
pub const CMD_SET: &str = "set";

pub const ARG_ENABLED: &str = "enabled";
pub const ARG_COOKIE_LIFETIME_HOURS: &str = "cookie-lifetime-hours";
pub const ARG_SHARE_ACCESS: &str = "share-access";
pub const ARG_SHARE_LINK_LIFETIME_HOURS: &str = "share-link-lifetime-hours";
pub const ARG_PROTECTED_CATEGORIES: &str = "protected-categories";
pub const ARG_CLEAR_PROTECTED_CATEGORIES: &str = "clear-protected-categories";
pub const ARG_EXEMPT_ROLES: &str = "exempt-roles";
pub const ARG_CLEAR_EXEMPT_ROLES: &str = "clear-exempt-roles";
pub const ARG_BLOG_PAGE_PROTECTED: &str = "blog-page-protected";
pub const ARG_HOME_PAGE_PROTECTED: &str = "home-page-protected";
pub const ARG_RESTRICTED_MESSAGE: &str = "restricted-message";
pub const ARG_RESTRICTED_MESSAGE_FEEDS: &str = "restricted-message-feeds";
pub const ARG_ERROR_MESSAGE: &str = "error-message";
pub const ARG_POPUP_TITLE: &str = "popup-title";
pub const ARG_RETURN_LINK_URL: &str = "return-link-url";
pub const ARG_RETURN_LINK_TEXT: &str = "return-link-text";

fn toggle(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .value_name("BOOL")
        .value_parser(clap::value_parser!(bool))
}

fn hours(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .value_name("HOURS")
        .value_parser(clap::value_parser!(u32).range(1..))
}

fn text(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).help(help).value_name("TEXT")
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_SETTINGS)
        .about("Show or change the protection settings")
        .subcommand_required(true)
        .subcommand(
            Command::new(CMD_SHOW).about("Print the settings record as JSON (password hash hidden)"),
        )
        .subcommand(
            Command::new(CMD_SET)
                .about("Change protection settings; unspecified fields keep their value")
                .arg_required_else_help(true)
                .arg(toggle(ARG_ENABLED, "Turn password protection on or off"))
                .arg(hours(
                    ARG_COOKIE_LIFETIME_HOURS,
                    "How long an access cookie stays valid",
                ))
                .arg(toggle(ARG_SHARE_ACCESS, "Allow share links"))
                .arg(hours(
                    ARG_SHARE_LINK_LIFETIME_HOURS,
                    "How long a share link stays valid",
                ))
                .arg(
                    Arg::new(ARG_PROTECTED_CATEGORIES)
                        .long(ARG_PROTECTED_CATEGORIES)
                        .help("Replace the protected category ids, comma separated")
                        .value_name("IDS")
                        .value_delimiter(',')
                        .num_args(1..)
                        .value_parser(clap::value_parser!(CategoryId))
                        .conflicts_with(ARG_CLEAR_PROTECTED_CATEGORIES),
                )
                .arg(
                    Arg::new(ARG_CLEAR_PROTECTED_CATEGORIES)
                        .long(ARG_CLEAR_PROTECTED_CATEGORIES)
                        .help("Protect no categories")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new(ARG_EXEMPT_ROLES)
                        .long(ARG_EXEMPT_ROLES)
                        .help("Replace the roles that bypass the password, comma separated")
                        .value_name("ROLES")
                        .value_delimiter(',')
                        .num_args(1..)
                        .conflicts_with(ARG_CLEAR_EXEMPT_ROLES),
                )
                .arg(
                    Arg::new(ARG_CLEAR_EXEMPT_ROLES)
                        .long(ARG_CLEAR_EXEMPT_ROLES)
                        .help("Exempt no roles")
                        .action(ArgAction::SetTrue),
                )
                .arg(toggle(
                    ARG_BLOG_PAGE_PROTECTED,
                    "Protect the blog listing page",
                ))
                .arg(toggle(ARG_HOME_PAGE_PROTECTED, "Protect the front page"))
                .arg(text(
                    ARG_RESTRICTED_MESSAGE,
                    "Message shown in place of protected content",
                ))
                .arg(text(
                    ARG_RESTRICTED_MESSAGE_FEEDS,
                    "Message shown in place of protected content in feeds",
                ))
                .arg(text(ARG_ERROR_MESSAGE, "Popup message after a wrong password"))
                .arg(text(ARG_POPUP_TITLE, "Popup title"))
                .arg(text(ARG_RETURN_LINK_URL, "Popup return link target"))
                .arg(text(ARG_RETURN_LINK_TEXT, "Popup return link text")),
        )
}

/// Collect the fields given to `settings set`.
#[must_use]
pub fn parse_update(matches: &ArgMatches) -> SettingsUpdate {
    let flag = |id: &str| matches.get_one::<bool>(id).copied();
    let number = |id: &str| matches.get_one::<u32>(id).copied();
    let string = |id: &str| matches.get_one::<String>(id).cloned();

    let protected_category_ids = if matches.get_flag(ARG_CLEAR_PROTECTED_CATEGORIES) {
        Some(BTreeSet::new())
    } else {
        matches
            .get_many::<CategoryId>(ARG_PROTECTED_CATEGORIES)
            .map(|ids| ids.copied().collect())
    };

    let exempt_roles = if matches.get_flag(ARG_CLEAR_EXEMPT_ROLES) {
        Some(BTreeSet::new())
    } else {
        matches
            .get_many::<String>(ARG_EXEMPT_ROLES)
            .map(|roles| roles.cloned().collect())
    };

    SettingsUpdate {
        enabled: flag(ARG_ENABLED),
        cookie_lifetime_hours: number(ARG_COOKIE_LIFETIME_HOURS),
        share_access_enabled: flag(ARG_SHARE_ACCESS),
        share_link_lifetime_hours: number(ARG_SHARE_LINK_LIFETIME_HOURS),
        protected_category_ids,
        exempt_roles,
        blog_page_protected: flag(ARG_BLOG_PAGE_PROTECTED),
        home_page_protected: flag(ARG_HOME_PAGE_PROTECTED),
        restricted_message: string(ARG_RESTRICTED_MESSAGE),
        restricted_message_feeds: string(ARG_RESTRICTED_MESSAGE_FEEDS),
        error_message: string(ARG_ERROR_MESSAGE),
        popup_title: string(ARG_POPUP_TITLE),
        return_link_url: string(ARG_RETURN_LINK_URL),
        return_link_text: string(ARG_RETURN_LINK_TEXT),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn set_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["settings", "set"];
        argv.extend_from_slice(args);
        let matches = subcommand().get_matches_from(argv);
        matches.subcommand_matches(CMD_SET).unwrap().clone()
    }

    #[test]
    fn set_parses_given_fields_only() {
        let update = parse_update(&set_matches(&[
            "--enabled",
            "false",
            "--protected-categories",
            "3,7",
            "--exempt-roles",
            "Editor,author",
            "--cookie-lifetime-hours",
            "48",
            "--popup-title",
            "Members only",
        ]));
        assert_eq!(update.enabled, Some(false));
        assert_eq!(
            update.protected_category_ids,
            Some([3, 7].into_iter().collect())
        );
        assert_eq!(update.exempt_roles.map(|roles| roles.len()), Some(2));
        assert_eq!(update.cookie_lifetime_hours, Some(48));
        assert_eq!(update.popup_title.as_deref(), Some("Members only"));
        assert_eq!(update.share_access_enabled, None);
        assert_eq!(update.restricted_message, None);
    }

    #[test]
    fn clear_flags_empty_the_sets() {
        let update = parse_update(&set_matches(&[
            "--clear-protected-categories",
            "--clear-exempt-roles",
        ]));
        assert_eq!(update.protected_category_ids, Some(BTreeSet::new()));
        assert_eq!(update.exempt_roles, Some(BTreeSet::new()));
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let result = subcommand().try_get_matches_from(vec![
            "settings",
            "set",
            "--share-link-lifetime-hours",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn clear_conflicts_with_values() {
        let result = subcommand().try_get_matches_from(vec![
            "settings",
            "set",
            "--protected-categories",
            "1",
            "--clear-protected-categories",
        ]);
        assert!(result.is_err());
    }
}
