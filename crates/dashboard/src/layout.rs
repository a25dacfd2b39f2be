/// Placeholder regions of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Sidebar,
    Body,
}

impl Region {
    pub const fn label(self) -> &'static str {
        match self {
            Region::Sidebar => "Sidebar",
            Region::Body => "Body",
        }
    }

    /// Utility classes from `public/style.css`.
    pub const fn class(self) -> &'static str {
        match self {
            Region::Sidebar => "w-64 bg-gray-200 p-4",
            Region::Body => "flex-1 bg-gray-100 p-4",
        }
    }
}
