use util::EnumFromStr;
use util_derive::EnumFromStr;

/// Names of the pre-authored assembly snippets the deployable manager can
/// inline. The core never parses the snippet bodies themselves; it only
/// tracks, per name, whether the guarded block has already been emitted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumFromStr)]
pub enum Deployable {
    Scancode,
    Dload,
    Dsave,
    Timer,
    Dstring,
    Plot,
    Vic2vars,
    Vic2startup,
    VscrollText,
}

impl Deployable {
    pub const ALL: &'static [Deployable] = &[
        Deployable::Scancode,
        Deployable::Dload,
        Deployable::Dsave,
        Deployable::Timer,
        Deployable::Dstring,
        Deployable::Plot,
        Deployable::Vic2vars,
        Deployable::Vic2startup,
        Deployable::VscrollText,
    ];

    /// The logical snippet name as it appears in diagnostics and labels,
    /// e.g. `"dload"`, `"vic2vars"`.
    pub fn name(self) -> &'static str {
        match self {
            Deployable::Scancode => "scancode",
            Deployable::Dload => "dload",
            Deployable::Dsave => "dsave",
            Deployable::Timer => "timer",
            Deployable::Dstring => "dstring",
            Deployable::Plot => "plot",
            Deployable::Vic2vars => "vic2vars",
            Deployable::Vic2startup => "vic2startup",
            Deployable::VscrollText => "vscroll_text",
        }
    }
}
