//! Locator strategies and element wait strategies.
//!
//! A [`By`] pairs a WebDriver location strategy (the `using` field of a
//! find-element request) with its selector value. Appium accepts the W3C
//! strategies plus a set of vendor strategies prefixed with `-`.
//!
//! # Example
//!
//! ```
//! use mobilis_core::locator::By;
//!
//! let by = By::accessibility_id("login-button");
//! assert_eq!(by.strategy(), "accessibility id");
//! assert_eq!(by.value(), "login-button");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A locator: strategy plus selector value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "using", content = "value", rename_all = "snake_case")]
pub enum By {
    /// Resource id (Android) or name/id (iOS).
    Id(String),
    /// XPath over the page source.
    #[serde(rename = "xpath")]
    XPath(String),
    /// Native class name, e.g. `android.widget.TextView`.
    ClassName(String),
    /// Content description (Android) or accessibility identifier (iOS).
    AccessibilityId(String),
    /// Element name attribute.
    Name(String),
    /// Tag name (web contexts).
    TagName(String),
    /// CSS selector (web contexts).
    CssSelector(String),
    /// Exact link text (web contexts).
    LinkText(String),
    /// Partial link text (web contexts).
    PartialLinkText(String),
    /// UiAutomator selector expression (UiAutomator2 only).
    #[serde(rename = "android_uiautomator")]
    AndroidUiAutomator(String),
    /// Espresso data matcher JSON (Espresso only).
    AndroidDataMatcher(String),
    /// NSPredicate string (XCUITest only).
    IosPredicate(String),
    /// XCUITest class chain query.
    IosClassChain(String),
    /// Base64-encoded template image.
    Image(String),
}

impl By {
    pub fn id(value: impl Into<String>) -> Self {
        By::Id(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        By::XPath(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        By::ClassName(value.into())
    }

    pub fn accessibility_id(value: impl Into<String>) -> Self {
        By::AccessibilityId(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        By::Name(value.into())
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        By::TagName(value.into())
    }

    pub fn css_selector(value: impl Into<String>) -> Self {
        By::CssSelector(value.into())
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        By::LinkText(value.into())
    }

    pub fn partial_link_text(value: impl Into<String>) -> Self {
        By::PartialLinkText(value.into())
    }

    pub fn android_uiautomator(value: impl Into<String>) -> Self {
        By::AndroidUiAutomator(value.into())
    }

    pub fn android_data_matcher(value: impl Into<String>) -> Self {
        By::AndroidDataMatcher(value.into())
    }

    pub fn ios_predicate(value: impl Into<String>) -> Self {
        By::IosPredicate(value.into())
    }

    pub fn ios_class_chain(value: impl Into<String>) -> Self {
        By::IosClassChain(value.into())
    }

    pub fn image(value: impl Into<String>) -> Self {
        By::Image(value.into())
    }

    /// The `using` string sent in a find-element request.
    pub fn strategy(&self) -> &'static str {
        match self {
            By::Id(_) => "id",
            By::XPath(_) => "xpath",
            By::ClassName(_) => "class name",
            By::AccessibilityId(_) => "accessibility id",
            By::Name(_) => "name",
            By::TagName(_) => "tag name",
            By::CssSelector(_) => "css selector",
            By::LinkText(_) => "link text",
            By::PartialLinkText(_) => "partial link text",
            By::AndroidUiAutomator(_) => "-android uiautomator",
            By::AndroidDataMatcher(_) => "-android datamatcher",
            By::IosPredicate(_) => "-ios predicate string",
            By::IosClassChain(_) => "-ios class chain",
            By::Image(_) => "-image",
        }
    }

    /// The selector value.
    pub fn value(&self) -> &str {
        match self {
            By::Id(v)
            | By::XPath(v)
            | By::ClassName(v)
            | By::AccessibilityId(v)
            | By::Name(v)
            | By::TagName(v)
            | By::CssSelector(v)
            | By::LinkText(v)
            | By::PartialLinkText(v)
            | By::AndroidUiAutomator(v)
            | By::AndroidDataMatcher(v)
            | By::IosPredicate(v)
            | By::IosClassChain(v)
            | By::Image(v) => v,
        }
    }

    /// JSON body of a find-element(s) request.
    pub fn to_request(&self) -> serde_json::Value {
        serde_json::json!({ "using": self.strategy(), "value": self.value() })
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By.{}: {}", self.strategy(), self.value())
    }
}

/// Condition an element must satisfy before it is considered found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// At least one matching element exists in the hierarchy.
    Present,
    /// At least one element matches and every match is displayed.
    #[default]
    Visible,
    /// The first match is displayed and enabled.
    Enabled,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitStrategy::Present => "present",
            WaitStrategy::Visible => "visible",
            WaitStrategy::Enabled => "enabled",
        };
        f.write_str(name)
    }
}
