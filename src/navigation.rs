//! The navigation bar shown at the top of every page for logged in users.

use maud::{Markup, html};

use crate::endpoints;

const CURRENT_LINK_STYLE: &str = "block py-2 px-3 rounded-sm text-white bg-blue-700 \
    lg:bg-transparent lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500";

const LINK_STYLE: &str = "block py-2 px-3 rounded-sm text-gray-900 hover:bg-gray-100 \
    lg:hover:bg-transparent lg:hover:text-blue-700 lg:p-0 dark:text-white \
    dark:hover:bg-gray-700 lg:dark:hover:text-blue-500 lg:dark:hover:bg-transparent";

/// A page in the navigation bar.
struct NavLink<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl NavLink<'_> {
    fn to_html(&self) -> Markup {
        let style = if self.is_current {
            CURRENT_LINK_STYLE
        } else {
            LINK_STYLE
        };

        html!(
            li
            {
                a
                    href=(self.url)
                    class=(style)
                    aria-current=[self.is_current.then_some("page")]
                {
                    (self.title)
                }
            }
        )
    }
}

/// The pages linked from the navigation bar, in display order.
const PAGES: [(&str, &str); 6] = [
    (endpoints::DASHBOARD_VIEW, "Dashboard"),
    (endpoints::TRANSACTIONS_VIEW, "Transactions"),
    (endpoints::ACCOUNTS_VIEW, "Accounts"),
    (endpoints::GOALS_VIEW, "Goals"),
    (endpoints::CATEGORIES_VIEW, "Budget"),
    (endpoints::PROFILE_VIEW, "Profile"),
];

pub struct NavBar<'a> {
    links: Vec<NavLink<'a>>,
}

impl NavBar<'_> {
    /// Create the navigation bar with the link to `active_endpoint` highlighted.
    ///
    /// The log-out link is always last and never highlighted.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let mut links: Vec<NavLink> = PAGES
            .into_iter()
            .map(|(url, title)| NavLink {
                url,
                title,
                is_current: active_endpoint == url,
            })
            .collect();

        links.push(NavLink {
            url: endpoints::LOG_OUT,
            title: "Log out",
            is_current: false,
        });

        NavBar { links }
    }

    pub fn into_html(self) -> Markup {
        let current_title = self
            .links
            .iter()
            .find(|link| link.is_current)
            .map_or("Menu", |link| link.title);

        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a href=(endpoints::ROOT) class="text-2xl font-semibold whitespace-nowrap dark:text-white"
                    {
                        "CtrlMoney"
                    }

                    // Small screens get a collapsible menu instead of the link row.
                    details class="lg:hidden relative"
                    {
                        summary
                            class="cursor-pointer rounded-lg px-3 py-2 text-sm font-medium
                            text-gray-700 hover:bg-gray-100 dark:text-gray-200 dark:hover:bg-gray-700"
                        {
                            (current_title)
                        }

                        ul
                            class="absolute right-0 z-40 mt-2 w-48 p-2 space-y-1 rounded-lg border
                            border-gray-200 bg-white shadow-lg dark:border-gray-700 dark:bg-gray-800"
                        {
                            @for link in &self.links {
                                (link.to_html())
                            }
                        }
                    }

                    ul
                        class="hidden lg:flex font-medium flex-row space-x-8 rtl:space-x-reverse"
                    {
                        @for link in &self.links {
                            (link.to_html())
                        }
                    }
                }
            }
        )
    }
}
