use crate::screen::ScreenMode;
use crate::verb::{AluOp, CompareOp, Target, Width};

/// Screen-mode tables for the two reference chipsets shipped with this
/// crate. Real targets (VIC-II, 6847, ...) would each own a table like
/// this; these two are deliberately small.
pub static VIC2_MODES: &[ScreenMode] = &[
    ScreenMode {
        id: "std_text",
        bitmap: false,
        width: 40,
        height: 25,
        colors: 16,
        description: "standard character mode",
        score: 1,
    },
    ScreenMode {
        id: "hires",
        bitmap: true,
        width: 320,
        height: 200,
        colors: 2,
        description: "hi-res bitmap",
        score: 2,
    },
    ScreenMode {
        id: "multicolor",
        bitmap: true,
        width: 160,
        height: 200,
        colors: 4,
        description: "multicolor bitmap",
        score: 3,
    },
];

pub static MC6847_MODES: &[ScreenMode] = &[
    ScreenMode {
        id: "text",
        bitmap: false,
        width: 32,
        height: 16,
        colors: 2,
        description: "alphanumeric mode",
        score: 1,
    },
    ScreenMode {
        id: "cg2",
        bitmap: true,
        width: 256,
        height: 192,
        colors: 4,
        description: "color graphics mode 2",
        score: 2,
    },
];

/// Reference implementation of the [`Target`] trait. Emits plausible,
/// generic assembly-like mnemonics (uppercase opcode, tab-indented, one per
/// line) rather than any specific real CPU encoding.
///
/// The same struct drives both the `c64` and `coco` reference targets; only
/// the name and screen-mode table differ, the way two chipset modules would
/// share most of their CPU-verb behavior while differing in chipset verbs.
pub struct ReferenceTarget {
    name: &'static str,
    modes: &'static [ScreenMode],
}

impl ReferenceTarget {
    pub fn c64() -> ReferenceTarget {
        ReferenceTarget {
            name: "c64",
            modes: VIC2_MODES,
        }
    }

    pub fn coco() -> ReferenceTarget {
        ReferenceTarget {
            name: "coco",
            modes: MC6847_MODES,
        }
    }
}

fn mnemonic_for_alu(op: AluOp) -> &'static str {
    match op {
        AluOp::Add => "ADD",
        AluOp::Sub => "SUB",
        AluOp::Mul => "MUL",
        AluOp::Div => "DIV",
        AluOp::And => "AND",
        AluOp::Or => "OR",
    }
}

fn mnemonic_for_compare(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "BEQ",
        CompareOp::Ne => "BNE",
        CompareOp::Lt => "BLT",
        CompareOp::Le => "BLE",
        CompareOp::Gt => "BGT",
        CompareOp::Ge => "BGE",
    }
}

fn suffix_for_width(width: Width) -> &'static str {
    match width {
        Width::Byte => "B",
        Width::Word => "W",
        Width::DWord => "D",
    }
}

impl Target for ReferenceTarget {
    fn name(&self) -> &'static str {
        self.name
    }

    fn screen_modes(&self) -> &'static [ScreenMode] {
        self.modes
    }

    fn mov(&self, dst: &str, src: &str, width: Width) -> Vec<String> {
        vec![format!("MOV{} {}, {}", suffix_for_width(width), dst, src)]
    }

    fn mov_immediate(&self, dst: &str, value: i64, width: Width) -> Vec<String> {
        vec![format!("MOV{} {}, #{}", suffix_for_width(width), dst, value)]
    }

    fn alu(&self, op: AluOp, dst: &str, lhs: &str, rhs: &str, width: Width) -> Vec<String> {
        vec![format!(
            "{}{} {}, {}, {}",
            mnemonic_for_alu(op),
            suffix_for_width(width),
            dst,
            lhs,
            rhs
        )]
    }

    fn not(&self, dst: &str, src: &str, width: Width) -> Vec<String> {
        vec![format!("NOT{} {}, {}", suffix_for_width(width), dst, src)]
    }

    fn compare_and_branch(
        &self,
        op: CompareOp,
        lhs: &str,
        rhs: &str,
        label: &str,
        width: Width,
    ) -> Vec<String> {
        vec![
            format!("CMP{} {}, {}", suffix_for_width(width), lhs, rhs),
            format!("{} {}", mnemonic_for_compare(op), label),
        ]
    }

    fn bveq(&self, src: &str, label: &str) -> Vec<String> {
        vec![format!("BVEQ {}, {}", src, label)]
    }

    fn jump(&self, label: &str) -> Vec<String> {
        vec![format!("JMP {}", label)]
    }

    fn label(&self, name: &str) -> Vec<String> {
        vec![format!("{}:", name)]
    }

    fn address_of(&self, dst: &str, name: &str) -> Vec<String> {
        vec![format!("LEA {}, {}", dst, name)]
    }

    fn mov_indirect(&self, dst: &str, base: &str, offset: i32, width: Width) -> Vec<String> {
        vec![format!(
            "MOV{} {}, {}({})",
            suffix_for_width(width),
            dst,
            offset,
            base
        )]
    }

    fn mov_indexed(&self, dst: &str, base: &str, index: &str, width: Width) -> Vec<String> {
        vec![format!(
            "MOV{} {}, ({}, {})",
            suffix_for_width(width),
            dst,
            base,
            index
        )]
    }

    fn call(&self, label: &str) -> Vec<String> {
        vec![format!("JSR {}", label)]
    }

    fn ret(&self) -> Vec<String> {
        vec!["RTS".to_owned()]
    }

    fn drop_frame(&self) -> Vec<String> {
        vec!["POPFRAME".to_owned()]
    }

    fn bitmap_enable(&self, mode: ScreenMode, address: Option<&str>) -> Vec<String> {
        let mut lines = vec![format!("BITMAP.ENABLE {}", mode.id)];
        if let Some(addr) = address {
            lines.push(format!("BITMAP.AT {}", addr));
        }
        lines
    }

    fn bitmap_disable(&self) -> Vec<String> {
        vec!["BITMAP.DISABLE".to_owned()]
    }

    fn textmap_enable(&self, address: Option<&str>) -> Vec<String> {
        let mut lines = vec!["TEXT.ENABLE".to_owned()];
        if let Some(addr) = address {
            lines.push(format!("TEXT.AT {}", addr));
        }
        lines
    }

    fn colormap_enable(&self, address: Option<&str>) -> Vec<String> {
        let mut lines = vec!["COLORMAP.ENABLE".to_owned()];
        if let Some(addr) = address {
            lines.push(format!("COLORMAP.AT {}", addr));
        }
        lines
    }

    fn tiles_enable(&self, address: Option<&str>) -> Vec<String> {
        let mut lines = vec!["TILES.ENABLE".to_owned()];
        if let Some(addr) = address {
            lines.push(format!("TILES.AT {}", addr));
        }
        lines
    }

    fn screen_clear(&self, value: Option<&str>) -> Vec<String> {
        match value {
            Some(v) => vec![format!("SCREEN.CLEAR {}", v)],
            None => vec!["SCREEN.CLEAR".to_owned()],
        }
    }

    fn screen_on(&self) -> Vec<String> {
        vec!["SCREEN.ON".to_owned()]
    }

    fn screen_off(&self) -> Vec<String> {
        vec!["SCREEN.OFF".to_owned()]
    }

    fn screen_rows(&self, rows: &str) -> Vec<String> {
        vec![format!("SCREEN.ROWS {}", rows)]
    }

    fn screen_scroll(&self, horizontal: bool, amount: &str) -> Vec<String> {
        let axis = if horizontal { "H" } else { "V" };
        vec![format!("SCREEN.SCROLL{} {}", axis, amount)]
    }

    fn sprite_load(&self, index: &str, data_label: &str) -> Vec<String> {
        vec![format!("SPRITE.LOAD {}, {}", index, data_label)]
    }

    fn sprite_set_multicolor(&self, index: &str, on: bool) -> Vec<String> {
        vec![format!(
            "SPRITE.MULTICOLOR {}, {}",
            index,
            if on { 1 } else { 0 }
        )]
    }

    fn sprite_set_color(&self, index: &str, color: &str) -> Vec<String> {
        vec![format!("SPRITE.COLOR {}, {}", index, color)]
    }

    fn sprite_set_position(&self, index: &str, x: &str, y: &str) -> Vec<String> {
        vec![format!("SPRITE.POS {}, {}, {}", index, x, y)]
    }

    fn sprite_enable(&self, index: &str, on: bool) -> Vec<String> {
        vec![format!(
            "SPRITE.ENABLE {}, {}",
            index,
            if on { 1 } else { 0 }
        )]
    }

    fn sprite_expand(&self, index: &str, horizontal: bool, on: bool) -> Vec<String> {
        let axis = if horizontal { "H" } else { "V" };
        vec![format!(
            "SPRITE.EXPAND{} {}, {}",
            axis,
            index,
            if on { 1 } else { 0 }
        )]
    }

    fn color_border(&self, color: &str) -> Vec<String> {
        vec![format!("COLOR.BORDER {}", color)]
    }

    fn color_background(&self, index: &str, color: &str) -> Vec<String> {
        vec![format!("COLOR.BACKGROUND {}, {}", index, color)]
    }

    fn color_sprite(&self, index: &str, color: &str) -> Vec<String> {
        vec![format!("COLOR.SPRITE {}, {}", index, color)]
    }

    fn raster_at(&self, line: &str, handler_label: &str) -> Vec<String> {
        vec![format!("RASTER.AT {}, {}", line, handler_label)]
    }

    fn wait_cycles(&self, amount: &str) -> Vec<String> {
        vec![format!("WAIT.CYCLES {}", amount)]
    }

    fn wait_ticks(&self, amount: &str) -> Vec<String> {
        vec![format!("WAIT.TICKS {}", amount)]
    }

    fn wait_ms(&self, amount: &str) -> Vec<String> {
        vec![format!("WAIT.MS {}", amount)]
    }

    fn point_at(&self, x: &str, y: &str) -> Vec<String> {
        vec![format!("POINT.AT {}, {}", x, y)]
    }

    fn point_get(&self, dst: &str, x: &str, y: &str) -> Vec<String> {
        vec![format!("POINT.GET {}, {}, {}", dst, x, y)]
    }

    fn peek(&self, dst: &str, address: &str) -> Vec<String> {
        vec![format!("PEEK {}, {}", dst, address)]
    }

    fn poke(&self, address: &str, value: &str) -> Vec<String> {
        vec![format!("POKE {}, {}", address, value)]
    }

    fn joy(&self, dst: &str, port: &str) -> Vec<String> {
        vec![format!("JOY {}, {}", dst, port)]
    }

    fn scancode(&self, dst: &str) -> Vec<String> {
        vec![format!("SCANCODE {}", dst)]
    }

    fn inkey(&self, dst: &str) -> Vec<String> {
        vec![format!("INKEY {}", dst)]
    }

    fn keyshift(&self, dst: &str) -> Vec<String> {
        vec![format!("KEYSHIFT {}", dst)]
    }

    fn key_state(&self, dst: &str, key: &str) -> Vec<String> {
        vec![format!("KEYSTATE {}, {}", dst, key)]
    }

    fn xpen(&self, dst: &str) -> Vec<String> {
        vec![format!("XPEN {}", dst)]
    }

    fn ypen(&self, dst: &str) -> Vec<String> {
        vec![format!("YPEN {}", dst)]
    }

    fn collision(&self, dst: &str, a: &str, b: &str) -> Vec<String> {
        vec![format!("COLLISION {}, {}, {}", dst, a, b)]
    }

    fn hit(&self, dst: &str, sprite: &str) -> Vec<String> {
        vec![format!("HIT {}, {}", dst, sprite)]
    }

    fn sys_call(&self, code: &str, arg: &str) -> Vec<String> {
        vec![format!("SYS {}, {}", code, arg)]
    }

    fn timer_start(&self, dst: &str) -> Vec<String> {
        vec![format!("TIMER.START {}", dst)]
    }

    fn timer_read(&self, dst: &str) -> Vec<String> {
        vec![format!("TIMER.READ {}", dst)]
    }

    fn print_number(&self, src: &str) -> Vec<String> {
        vec![format!("PRINT.NUM {}", src)]
    }

    fn print_string(&self, src: &str) -> Vec<String> {
        vec![format!("PRINT.STR {}", src)]
    }

    fn random(&self, dst: &str, width: Width) -> Vec<String> {
        vec![format!("RND{} {}", suffix_for_width(width), dst)]
    }

    fn color_constant(&self, dst: &str, name: &str) -> Vec<String> {
        vec![format!("MOVB {}, #COLOR_{}", dst, name.to_ascii_uppercase())]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn c64_and_coco_expose_distinct_mode_tables() {
        let c64 = ReferenceTarget::c64();
        let coco = ReferenceTarget::coco();
        assert_ne!(c64.screen_modes(), coco.screen_modes());
    }

    #[test]
    fn alu_verb_names_the_operator_and_width() {
        let target = ReferenceTarget::c64();
        let lines = target.alu(AluOp::Add, "_tmp0", "_tmp1", "_tmp2", Width::Word);
        assert_eq!(vec!["ADDW _tmp0, _tmp1, _tmp2".to_owned()], lines);
    }
}
