use crate::screen::ScreenMode;

/// Arithmetic/logical/compare operators a CPU verb can be asked to emit.
/// Mirrors `vcpu::enums::AluFunct`'s shape, narrowed to the operations the
/// expression emitter actually needs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Operand width in bytes, used by the CPU move/arithmetic verbs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Width {
    Byte,
    Word,
    DWord,
}

impl Width {
    pub fn bytes(self) -> u8 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::DWord => 4,
        }
    }
}

/// Named color, resolved by the target to whatever palette index/constant
/// its chipset uses.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ColorName<'a>(pub &'a str);

/// The target plug-in interface. Each method accepts the
/// already-emitted operand names the caller allocated (temporaries,
/// variables, direct integers formatted as text) and returns the assembly
/// lines to append verbatim to the sink — one primitive call, one or more
/// lines out, no further interpretation by the core.
///
/// Implementations are expected to be stateless with respect to the
/// compiled program (all persistent compiler state lives in
/// `ugbc_core::env::Environment`); a `Target` only knows how to turn one
/// verb invocation into text for its CPU/chipset.
pub trait Target {
    /// Short identifier used on the CLI and in diagnostics, e.g. `"c64"`.
    fn name(&self) -> &'static str;

    fn screen_modes(&self) -> &'static [ScreenMode];

    // ---- CPU verbs ----------------------------------------------------
    fn mov(&self, dst: &str, src: &str, width: Width) -> Vec<String>;
    fn mov_immediate(&self, dst: &str, value: i64, width: Width) -> Vec<String>;
    fn alu(&self, op: AluOp, dst: &str, lhs: &str, rhs: &str, width: Width) -> Vec<String>;
    fn not(&self, dst: &str, src: &str, width: Width) -> Vec<String>;
    /// Emits a compare of `lhs`/`rhs` followed by a branch to `label` taken
    /// when the comparison holds.
    fn compare_and_branch(
        &self,
        op: CompareOp,
        lhs: &str,
        rhs: &str,
        label: &str,
        width: Width,
    ) -> Vec<String>;
    /// Branch-if-byte-is-zero, used by IF/WHILE/EXIT IF lowering.
    fn bveq(&self, src: &str, label: &str) -> Vec<String>;
    fn jump(&self, label: &str) -> Vec<String>;
    fn label(&self, name: &str) -> Vec<String>;
    fn address_of(&self, dst: &str, name: &str) -> Vec<String>;
    fn mov_indirect(&self, dst: &str, base: &str, offset: i32, width: Width) -> Vec<String>;
    /// Indirect move with a runtime byte-offset register, used for array
    /// element access where the offset isn't known until the index
    /// expression(s) are evaluated.
    fn mov_indexed(&self, dst: &str, base: &str, index: &str, width: Width) -> Vec<String>;
    fn call(&self, label: &str) -> Vec<String>;
    fn ret(&self) -> Vec<String>;
    /// Drops the top call frame (the `POP` statement). Distinct from any
    /// loop/conditional bookkeeping: this is purely a runtime GOSUB-stack
    /// operation.
    fn drop_frame(&self) -> Vec<String>;

    // ---- Chipset verbs --------------------------------------------------
    fn bitmap_enable(&self, mode: ScreenMode, address: Option<&str>) -> Vec<String>;
    fn bitmap_disable(&self) -> Vec<String>;
    fn textmap_enable(&self, address: Option<&str>) -> Vec<String>;
    fn colormap_enable(&self, address: Option<&str>) -> Vec<String>;
    fn tiles_enable(&self, address: Option<&str>) -> Vec<String>;
    fn screen_clear(&self, value: Option<&str>) -> Vec<String>;
    fn screen_on(&self) -> Vec<String>;
    fn screen_off(&self) -> Vec<String>;
    fn screen_rows(&self, rows: &str) -> Vec<String>;
    fn screen_scroll(&self, horizontal: bool, amount: &str) -> Vec<String>;

    fn sprite_load(&self, index: &str, data_label: &str) -> Vec<String>;
    fn sprite_set_multicolor(&self, index: &str, on: bool) -> Vec<String>;
    fn sprite_set_color(&self, index: &str, color: &str) -> Vec<String>;
    fn sprite_set_position(&self, index: &str, x: &str, y: &str) -> Vec<String>;
    fn sprite_enable(&self, index: &str, on: bool) -> Vec<String>;
    fn sprite_expand(&self, index: &str, horizontal: bool, on: bool) -> Vec<String>;

    fn color_border(&self, color: &str) -> Vec<String>;
    fn color_background(&self, index: &str, color: &str) -> Vec<String>;
    fn color_sprite(&self, index: &str, color: &str) -> Vec<String>;

    fn raster_at(&self, line: &str, handler_label: &str) -> Vec<String>;
    fn wait_cycles(&self, amount: &str) -> Vec<String>;
    fn wait_ticks(&self, amount: &str) -> Vec<String>;
    fn wait_ms(&self, amount: &str) -> Vec<String>;

    fn point_at(&self, x: &str, y: &str) -> Vec<String>;
    fn point_get(&self, dst: &str, x: &str, y: &str) -> Vec<String>;
    fn peek(&self, dst: &str, address: &str) -> Vec<String>;
    fn poke(&self, address: &str, value: &str) -> Vec<String>;

    fn joy(&self, dst: &str, port: &str) -> Vec<String>;
    fn scancode(&self, dst: &str) -> Vec<String>;
    fn inkey(&self, dst: &str) -> Vec<String>;
    fn keyshift(&self, dst: &str) -> Vec<String>;
    fn key_state(&self, dst: &str, key: &str) -> Vec<String>;
    fn xpen(&self, dst: &str) -> Vec<String>;
    fn ypen(&self, dst: &str) -> Vec<String>;
    fn collision(&self, dst: &str, a: &str, b: &str) -> Vec<String>;
    fn hit(&self, dst: &str, sprite: &str) -> Vec<String>;

    fn sys_call(&self, code: &str, arg: &str) -> Vec<String>;
    fn timer_start(&self, dst: &str) -> Vec<String>;
    fn timer_read(&self, dst: &str) -> Vec<String>;

    fn print_number(&self, src: &str) -> Vec<String>;
    fn print_string(&self, src: &str) -> Vec<String>;

    /// A typed random value (`RANDOM BYTE`/`WORD`/`DWORD`/`POSITION`/`COLOR`).
    fn random(&self, dst: &str, width: Width) -> Vec<String>;
    /// Resolves a named color (`RED`, `LIGHTBLUE`, ...) to this target's
    /// palette representation.
    fn color_constant(&self, dst: &str, name: &str) -> Vec<String>;
}
