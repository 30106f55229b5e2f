//! Enumerated codes used on the wire.

/// Audience member status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemberStatus {
    /// Receives mailings.
    #[default]
    Active,
    /// Address bounced or is otherwise broken.
    Error,
    /// Added through a forwarded mailing.
    Forwarded,
    /// Opted out of future mailings.
    OptOut,
}

impl MemberStatus {
    /// Parse from a wire code (`a`) or a name (`active`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "a" | "active" => Some(Self::Active),
            "e" | "error" => Some(Self::Error),
            "f" | "forwarded" => Some(Self::Forwarded),
            "o" | "opt-out" | "optout" => Some(Self::OptOut),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Active => "a",
            Self::Error => "e",
            Self::Forwarded => "f",
            Self::OptOut => "o",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Error => "error",
            Self::Forwarded => "forwarded",
            Self::OptOut => "opt-out",
        }
    }

    /// Whether a member update may carry this status as `status_to`.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        matches!(self, Self::Active | Self::Error | Self::OptOut)
    }
}

/// Kind of audience group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupType {
    /// Ordinary group.
    RegularGroup,
    /// Group used for test sends.
    TestGroup,
    /// Group hidden from the audience UI.
    HiddenGroup,
}

impl GroupType {
    /// Parse from a wire code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "g" => Some(Self::RegularGroup),
            "t" => Some(Self::TestGroup),
            "h" => Some(Self::HiddenGroup),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::RegularGroup => "g",
            Self::TestGroup => "t",
            Self::HiddenGroup => "h",
        }
    }
}

/// Kind of mailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailingType {
    /// Regular mailing.
    Standard,
    /// Test send.
    Test,
    /// Sent by a trigger.
    Trigger,
    /// Split test.
    SplitTest,
}

impl MailingType {
    /// Parse from a wire code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "m" => Some(Self::Standard),
            "t" => Some(Self::Test),
            "r" => Some(Self::Trigger),
            "s" => Some(Self::SplitTest),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Standard => "m",
            Self::Test => "t",
            Self::Trigger => "r",
            Self::SplitTest => "s",
        }
    }
}

/// Delivery status of a mailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailingStatus {
    /// Scheduled, not yet sending.
    Pending,
    /// Paused by the user.
    Paused,
    /// Sending now.
    Sending,
    /// Canceled before completion.
    Canceled,
    /// Finished sending.
    Complete,
    /// Failed to send.
    Failed,
    /// Ready to send.
    Ready,
}

impl MailingStatus {
    /// Parse from a wire code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "p" => Some(Self::Pending),
            "a" => Some(Self::Paused),
            "s" => Some(Self::Sending),
            "x" => Some(Self::Canceled),
            "c" => Some(Self::Complete),
            "f" => Some(Self::Failed),
            "r" => Some(Self::Ready),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Pending => "p",
            Self::Paused => "a",
            Self::Sending => "s",
            Self::Canceled => "x",
            Self::Complete => "c",
            Self::Failed => "f",
            Self::Ready => "r",
        }
    }
}

/// Status a mailing can be moved to by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailingStatusUpdate {
    /// Cancel the mailing.
    Canceled,
    /// Pause sending.
    Paused,
    /// Resume or release the mailing.
    Ready,
}

impl MailingStatusUpdate {
    /// Keyword the update endpoint expects.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::Paused => "paused",
            Self::Ready => "ready",
        }
    }
}

/// Outcome of a member import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportStatus {
    /// Import completed.
    Ok,
    /// Import failed.
    Error,
}

impl ImportStatus {
    /// Parse from a wire code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "o" => Some(Self::Ok),
            "e" => Some(Self::Error),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Ok => "o",
            Self::Error => "e",
        }
    }
}

/// How an import treated existing members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportStyle {
    /// Only new members were added.
    AddOnly,
    /// New members added, existing ones updated.
    AddAndUpdate,
}

impl ImportStyle {
    /// Parse from a wire code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "a" => Some(Self::AddOnly),
            "b" => Some(Self::AddAndUpdate),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::AddOnly => "a",
            Self::AddAndUpdate => "b",
        }
    }
}

/// Delivery outcome filter for the deliveries report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryType {
    /// Delivered.
    Delivered,
    /// Hard bounce.
    HardBounce,
    /// Soft bounce.
    SoftBounce,
}

impl DeliveryType {
    /// Parse from a wire code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "d" => Some(Self::Delivered),
            "b" => Some(Self::HardBounce),
            "s" => Some(Self::SoftBounce),
            _ => None,
        }
    }

    /// Wire code (`del_status`).
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Delivered => "d",
            Self::HardBounce => "b",
            Self::SoftBounce => "s",
        }
    }
}

/// Portion of a personalized message to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessagePart {
    /// HTML body only.
    Html,
    /// Plain-text body only.
    Plaintext,
    /// Subject line only.
    Subject,
}

impl MessagePart {
    /// Value of the `type` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Plaintext => "plaintext",
            Self::Subject => "subject",
        }
    }
}

/// Which enumeration a coded field decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// [`MemberStatus`]
    MemberStatus,
    /// [`GroupType`]
    GroupType,
    /// [`MailingType`]
    MailingType,
    /// [`MailingStatus`]
    MailingStatus,
    /// [`ImportStatus`]
    ImportStatus,
    /// [`ImportStyle`]
    ImportStyle,
}

impl CodeKind {
    /// Decode a wire code of this kind.
    #[must_use]
    pub fn decode(self, s: &str) -> Option<Code> {
        match self {
            Self::MemberStatus => MemberStatus::parse(s).map(Code::MemberStatus),
            Self::GroupType => GroupType::parse(s).map(Code::GroupType),
            Self::MailingType => MailingType::parse(s).map(Code::MailingType),
            Self::MailingStatus => MailingStatus::parse(s).map(Code::MailingStatus),
            Self::ImportStatus => ImportStatus::parse(s).map(Code::ImportStatus),
            Self::ImportStyle => ImportStyle::parse(s).map(Code::ImportStyle),
        }
    }
}

/// A decoded enumerated field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Member status.
    MemberStatus(MemberStatus),
    /// Group type.
    GroupType(GroupType),
    /// Mailing type.
    MailingType(MailingType),
    /// Mailing status.
    MailingStatus(MailingStatus),
    /// Import status.
    ImportStatus(ImportStatus),
    /// Import style.
    ImportStyle(ImportStyle),
}

impl Code {
    /// Wire code.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::MemberStatus(c) => c.as_code(),
            Self::GroupType(c) => c.as_code(),
            Self::MailingType(c) => c.as_code(),
            Self::MailingStatus(c) => c.as_code(),
            Self::ImportStatus(c) => c.as_code(),
            Self::ImportStyle(c) => c.as_code(),
        }
    }
}

impl From<MemberStatus> for Code {
    fn from(value: MemberStatus) -> Self {
        Self::MemberStatus(value)
    }
}

impl From<GroupType> for Code {
    fn from(value: GroupType) -> Self {
        Self::GroupType(value)
    }
}

impl From<MailingType> for Code {
    fn from(value: MailingType) -> Self {
        Self::MailingType(value)
    }
}

impl From<MailingStatus> for Code {
    fn from(value: MailingStatus) -> Self {
        Self::MailingStatus(value)
    }
}

impl From<ImportStatus> for Code {
    fn from(value: ImportStatus) -> Self {
        Self::ImportStatus(value)
    }
}

impl From<ImportStyle> for Code {
    fn from(value: ImportStyle) -> Self {
        Self::ImportStyle(value)
    }
}
