//! A hand-rolled textual IR format for driving the pipeline without a
//! real host compiler attached: a line-oriented, assembly-like syntax
//! covering `chakravyuha-ir`'s module/global/function/instruction set.
//! Round-trips enough of the model for test inputs and for dumping a
//! transformed module back to disk; it is a harness convenience, not a
//! general-purpose textual IR.
//!
//! Grammar sketch (one statement per line, `;` starts a line comment):
//!
//! ```text
//! module hello
//! global .str.hi = private constant cstr "hi\n"
//! extern @print_str(ptr, i32)
//! func @main() -> i32 {
//! entry:
//!   %0 = icmp slt arg0, const i32 0
//!   condbr %0, label neg, label pos
//! neg:
//!   ret const i32 -1
//! pos:
//!   ret const i32 1
//! }
//! ```

use std::collections::HashMap;

use chakravyuha_ir::{
    Block, Builder, Callee, ConstantData, Cursor, Function, GlobalId, GlobalVariable, IcmpPred, Linkage, Module,
    Opcode, Type, Value,
};

pub fn parse_module(text: &str) -> Result<Module, String> {
    Parser::new(text).parse_module()
}

pub fn dump_module(module: &Module) -> String {
    Dumper { module }.dump()
}

// ---- lexing -----------------------------------------------------------

fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut s = String::from("\"");
            for ch in chars.by_ref() {
                if ch == '"' {
                    break;
                }
                s.push(ch);
            }
            s.push('"');
            tokens.push(s);
        } else if "(),:[]".contains(c) {
            tokens.push(c.to_string());
            chars.next();
        } else {
            let mut s = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || "(),:[]\"".contains(ch) {
                    break;
                }
                s.push(ch);
                chars.next();
            }
            tokens.push(s);
        }
    }
    tokens
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn unescape(literal: &str) -> Vec<u8> {
    let inner = literal.trim_start_matches('"').trim_end_matches('"');
    let mut bytes = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => bytes.push(b'\n'),
                Some('t') => bytes.push(b'\t'),
                Some('0') => bytes.push(0),
                Some('\\') => bytes.push(b'\\'),
                Some('"') => bytes.push(b'"'),
                Some(other) => bytes.extend(other.to_string().as_bytes()),
                None => {}
            }
        } else {
            bytes.extend(c.to_string().as_bytes());
        }
    }
    bytes
}

fn escape(bytes: &[u8]) -> String {
    let mut s = String::new();
    for &b in bytes {
        match b {
            b'\n' => s.push_str("\\n"),
            b'\t' => s.push_str("\\t"),
            0 => s.push_str("\\0"),
            b'\\' => s.push_str("\\\\"),
            b'"' => s.push_str("\\\""),
            0x20..=0x7e => s.push(b as char),
            other => s.push_str(&format!("\\x{other:02x}")),
        }
    }
    s
}

fn parse_type(tok: &str) -> Result<Type, String> {
    match tok {
        "i1" => Ok(Type::I1),
        "i8" => Ok(Type::I8),
        "i32" => Ok(Type::I32),
        "i64" => Ok(Type::I64),
        "ptr" => Ok(Type::Ptr),
        other => Err(format!("unknown type `{other}`")),
    }
}

fn type_name(ty: Type) -> &'static str {
    match ty {
        Type::I1 => "i1",
        Type::I8 => "i8",
        Type::I32 => "i32",
        Type::I64 => "i64",
        Type::Ptr => "ptr",
    }
}

fn parse_pred(tok: &str) -> Result<IcmpPred, String> {
    match tok {
        "eq" => Ok(IcmpPred::Eq),
        "ne" => Ok(IcmpPred::Ne),
        "slt" => Ok(IcmpPred::Slt),
        "sgt" => Ok(IcmpPred::Sgt),
        "sle" => Ok(IcmpPred::Sle),
        "sge" => Ok(IcmpPred::Sge),
        other => Err(format!("unknown icmp predicate `{other}`")),
    }
}

fn pred_name(pred: IcmpPred) -> &'static str {
    match pred {
        IcmpPred::Eq => "eq",
        IcmpPred::Ne => "ne",
        IcmpPred::Slt => "slt",
        IcmpPred::Sgt => "sgt",
        IcmpPred::Sle => "sle",
        IcmpPred::Sge => "sge",
    }
}

fn parse_linkage(tok: &str) -> Result<Linkage, String> {
    match tok {
        "external" => Ok(Linkage::External),
        "internal" => Ok(Linkage::Internal),
        "private" => Ok(Linkage::Private),
        other => Err(format!("unknown linkage `{other}`")),
    }
}

fn linkage_name(linkage: Linkage) -> &'static str {
    match linkage {
        Linkage::External => "external",
        Linkage::Internal => "internal",
        Linkage::Private => "private",
    }
}

// ---- parsing ------------------------------------------------------------

struct Line {
    tokens: Vec<String>,
}

struct Parser {
    lines: Vec<Line>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(strip_comment)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| Line { tokens: tokenize(l) })
            .collect();
        Parser { lines, pos: 0 }
    }

    fn take(&mut self) -> Result<Vec<String>, String> {
        let line = self.lines.get(self.pos).ok_or_else(|| "unexpected end of input".to_owned())?;
        self.pos += 1;
        Ok(line.tokens.clone())
    }

    fn parse_module(&mut self) -> Result<Module, String> {
        let header = self.take()?;
        if header.first().map(String::as_str) != Some("module") {
            return Err("expected `module <name>` as the first statement".to_owned());
        }
        let mut module = Module::new(header.get(1).cloned().unwrap_or_else(|| "unnamed".to_owned()));
        let mut globals: HashMap<String, GlobalId> = HashMap::new();

        while self.pos < self.lines.len() {
            match self.lines[self.pos].tokens[0].as_str() {
                "global" => self.parse_global(&mut module, &mut globals)?,
                "extern" => self.parse_extern(&mut module)?,
                "func" => self.parse_function(&mut module, &globals)?,
                other => return Err(format!("unexpected top-level statement `{other}`")),
            }
        }
        Ok(module)
    }

    fn parse_global(&mut self, module: &mut Module, globals: &mut HashMap<String, GlobalId>) -> Result<(), String> {
        let t = self.take()?;
        // global <name> = <linkage> constant <cstr|bytes> "<literal>"
        if t.len() < 7 || t[2] != "=" || t[4] != "constant" {
            return Err(format!("malformed `global` statement: {t:?}"));
        }
        let name = t[1].clone();
        let linkage = parse_linkage(&t[3])?;
        let data = match t[5].as_str() {
            "cstr" => {
                let mut bytes = unescape(&t[6]);
                bytes.push(0);
                ConstantData::CString { bytes, nul_terminated: true }
            }
            "bytes" => ConstantData::Bytes(unescape(&t[6])),
            other => return Err(format!("unknown global constant kind `{other}`")),
        };
        let cid = module.add_constant(data);
        let gid = module.create_global(GlobalVariable { name: name.clone(), is_constant: true, linkage, initializer: Some(cid) });
        globals.insert(name, gid);
        Ok(())
    }

    fn parse_extern(&mut self, module: &mut Module) -> Result<(), String> {
        let t = self.take()?;
        if t.len() < 4 || !t[1].starts_with('@') {
            return Err(format!("malformed `extern` statement: {t:?}"));
        }
        let name = t[1].trim_start_matches('@').to_owned();
        let (params, ret_ty) = parse_signature(&t, 2)?;
        module.create_function(Function::declaration(name, params, ret_ty));
        Ok(())
    }

    fn parse_function(&mut self, module: &mut Module, globals: &HashMap<String, GlobalId>) -> Result<(), String> {
        let header = self.take()?;
        if header.len() < 4 || !header[1].starts_with('@') {
            return Err(format!("malformed `func` statement: {header:?}"));
        }
        let name = header[1].trim_start_matches('@').to_owned();
        let (params, ret_ty) = parse_signature(&header, 2)?;
        if header.last().map(String::as_str) != Some("{") {
            return Err("function header must end in `{`".to_owned());
        }

        let mut func = Function::new(name, params, ret_ty);
        let entry = func.entry();

        // Pass 1: collect block labels and create their blocks up front,
        // so a branch can name a target that appears later in the text.
        let body_start = self.pos;
        let mut body_end = body_start;
        while !(self.lines[body_end].tokens.len() == 1 && self.lines[body_end].tokens[0] == "}") {
            body_end += 1;
        }

        let mut blocks: HashMap<String, Block> = HashMap::new();
        let mut first_label = true;
        for idx in body_start..body_end {
            let toks = &self.lines[idx].tokens;
            if toks.len() == 2 && toks[1] == ":" {
                let block = if first_label {
                    first_label = false;
                    entry
                } else {
                    func.create_block()
                };
                blocks.insert(toks[0].clone(), block);
            }
        }

        // Pass 2: emit instructions against the now-known block map.
        let mut locals: HashMap<String, Value> = HashMap::new();
        let mut current = entry;
        for idx in body_start..body_end {
            let toks = self.lines[idx].tokens.clone();
            if toks.len() == 2 && toks[1] == ":" {
                current = blocks[&toks[0]];
                continue;
            }
            parse_instruction(&toks, module, &mut func, current, &blocks, globals, &mut locals)?;
        }
        self.pos = body_end + 1;

        module.create_function(func);
        Ok(())
    }
}

/// Parses `( <ty>, ... ) [ -> <ty> ] {`-or-end, starting at `start`.
fn parse_signature(t: &[String], start: usize) -> Result<(Vec<Type>, Option<Type>), String> {
    if t.get(start).map(String::as_str) != Some("(") {
        return Err(format!("expected `(` at token {start} in {t:?}"));
    }
    let mut i = start + 1;
    let mut params = Vec::new();
    while t.get(i).map(String::as_str) != Some(")") {
        if t[i] != "," {
            params.push(parse_type(&t[i])?);
        }
        i += 1;
    }
    i += 1;
    let ret_ty = if t.get(i).map(String::as_str) == Some("->") { Some(parse_type(&t[i + 1])?) } else { None };
    Ok((params, ret_ty))
}

fn parse_value(
    toks: &[String],
    pos: &mut usize,
    module: &mut Module,
    globals: &HashMap<String, GlobalId>,
    locals: &HashMap<String, Value>,
) -> Result<Value, String> {
    let tok = toks.get(*pos).ok_or("expected a value, found end of instruction")?.clone();
    if tok == "const" {
        let ty = parse_type(&toks[*pos + 1])?;
        let n: i64 = toks[*pos + 2].parse().map_err(|_| format!("bad integer literal `{}`", toks[*pos + 2]))?;
        *pos += 3;
        Ok(Value::Const(module.add_constant(ConstantData::Int { ty, value: n })))
    } else if tok == "global" {
        let name = &toks[*pos + 1];
        let gid = *globals.get(name).ok_or_else(|| format!("undefined global `{name}`"))?;
        *pos += 2;
        Ok(Value::Global(gid))
    } else if tok == "undef" {
        *pos += 1;
        Ok(Value::Undef)
    } else if let Some(rest) = tok.strip_prefix("arg") {
        let n: u32 = rest.parse().map_err(|_| format!("bad parameter index `{tok}`"))?;
        *pos += 1;
        Ok(Value::Param(n))
    } else if tok.starts_with('%') {
        let v = *locals.get(&tok).ok_or_else(|| format!("undefined local `{tok}`"))?;
        *pos += 1;
        Ok(v)
    } else {
        Err(format!("expected a value, found `{tok}`"))
    }
}

fn expect(toks: &[String], pos: &mut usize, want: &str) -> Result<(), String> {
    if toks.get(*pos).map(String::as_str) != Some(want) {
        return Err(format!("expected `{want}` at token {pos} in {toks:?}"));
    }
    *pos += 1;
    Ok(())
}

fn parse_block_ref(toks: &[String], pos: &mut usize, blocks: &HashMap<String, Block>) -> Result<Block, String> {
    expect(toks, pos, "label")?;
    let name = toks.get(*pos).ok_or("expected a block label")?.clone();
    *pos += 1;
    blocks.get(&name).copied().ok_or_else(|| format!("undefined block label `{name}`"))
}

#[allow(clippy::too_many_arguments)]
fn parse_instruction(
    toks: &[String],
    module: &mut Module,
    func: &mut Function,
    block: Block,
    blocks: &HashMap<String, Block>,
    globals: &HashMap<String, GlobalId>,
    locals: &mut HashMap<String, Value>,
) -> Result<(), String> {
    let (dest, mut pos, op) = if toks.len() >= 2 && toks[0].starts_with('%') && toks[1] == "=" {
        (Some(toks[0].clone()), 2, toks[2].as_str())
    } else {
        (None, 0, toks[0].as_str())
    };

    macro_rules! val {
        () => {
            parse_value(toks, &mut pos, module, globals, locals)?
        };
    }

    let mut b = Builder::new(func, Cursor::AtBlockEnd(block));
    let result: Option<Value> = match op {
        "alloca" => {
            pos += 1;
            let ty = parse_type(&toks[pos])?;
            pos += 1;
            let count: u32 = toks[pos].parse().map_err(|_| format!("bad alloca count `{}`", toks[pos]))?;
            Some(b.alloca(ty, count))
        }
        "load" => {
            pos += 1;
            let ty = parse_type(&toks[pos])?;
            pos += 1;
            expect(toks, &mut pos, ",")?;
            let ptr = val!();
            Some(b.load(ty, ptr))
        }
        "store" => {
            pos += 1;
            let value = val!();
            expect(toks, &mut pos, ",")?;
            let ptr = val!();
            b.store(value, ptr);
            None
        }
        "gep" => {
            pos += 1;
            let base = val!();
            expect(toks, &mut pos, ",")?;
            expect(toks, &mut pos, "[")?;
            let mut indices = Vec::new();
            while toks.get(pos).map(String::as_str) != Some("]") {
                indices.push(val!());
                if toks.get(pos).map(String::as_str) == Some(",") {
                    pos += 1;
                }
            }
            pos += 1;
            Some(b.gep(base, indices))
        }
        "bitcast" => {
            pos += 1;
            let value = val!();
            expect(toks, &mut pos, "to")?;
            let to = parse_type(&toks[pos])?;
            Some(b.bitcast(value, to))
        }
        "call" => {
            pos += 1;
            // An assigned call always names its result type explicitly
            // (`%N = call <ty> @f(...)`); a void call never does.
            let result_ty = if dest.is_some() {
                let ty = parse_type(&toks[pos])?;
                pos += 1;
                Some(ty)
            } else {
                None
            };
            let callee = if toks[pos] == "extern" {
                pos += 1;
                let name = toks[pos].trim_matches('"').to_owned();
                pos += 1;
                Callee::Extern(name)
            } else {
                let name = toks[pos].trim_start_matches('@').to_owned();
                pos += 1;
                let fid = module.find_function(&name).ok_or_else(|| format!("call to undefined function `{name}`"))?;
                Callee::Function(fid)
            };
            expect(toks, &mut pos, "(")?;
            let mut args = Vec::new();
            while toks.get(pos).map(String::as_str) != Some(")") {
                args.push(val!());
                if toks.get(pos).map(String::as_str) == Some(",") {
                    pos += 1;
                }
            }
            b.call(callee, args, result_ty)
        }
        "icmp" => {
            pos += 1;
            let pred = parse_pred(&toks[pos])?;
            pos += 1;
            let lhs = val!();
            expect(toks, &mut pos, ",")?;
            let rhs = val!();
            Some(b.icmp(pred, lhs, rhs))
        }
        "select" => {
            pos += 1;
            let ty = parse_type(&toks[pos])?;
            pos += 1;
            let cond = val!();
            expect(toks, &mut pos, ",")?;
            let if_true = val!();
            expect(toks, &mut pos, ",")?;
            let if_false = val!();
            Some(b.select(ty, cond, if_true, if_false))
        }
        "xor" => {
            pos += 1;
            let ty = parse_type(&toks[pos])?;
            pos += 1;
            let lhs = val!();
            expect(toks, &mut pos, ",")?;
            let rhs = val!();
            Some(b.xor(ty, lhs, rhs))
        }
        "add" => {
            pos += 1;
            let ty = parse_type(&toks[pos])?;
            pos += 1;
            let lhs = val!();
            expect(toks, &mut pos, ",")?;
            let rhs = val!();
            Some(b.add(ty, lhs, rhs))
        }
        "br" => {
            pos += 1;
            let target = parse_block_ref(toks, &mut pos, blocks)?;
            b.br(target);
            None
        }
        "condbr" => {
            pos += 1;
            let cond = val!();
            expect(toks, &mut pos, ",")?;
            let then_block = parse_block_ref(toks, &mut pos, blocks)?;
            expect(toks, &mut pos, ",")?;
            let else_block = parse_block_ref(toks, &mut pos, blocks)?;
            b.cond_br(cond, then_block, else_block);
            None
        }
        "switch" => {
            pos += 1;
            let cond = val!();
            expect(toks, &mut pos, ",")?;
            let default = parse_block_ref(toks, &mut pos, blocks)?;
            let mut cases = Vec::new();
            while toks.get(pos).map(String::as_str) == Some(",") {
                pos += 1;
                let n: i64 = toks[pos].parse().map_err(|_| format!("bad case value `{}`", toks[pos]))?;
                pos += 1;
                expect(toks, &mut pos, "->")?;
                let target = parse_block_ref(toks, &mut pos, blocks)?;
                cases.push((n, target));
            }
            b.switch(cond, default, cases);
            None
        }
        "ret" => {
            pos += 1;
            if toks.get(pos).map(String::as_str) == Some("void") {
                b.ret(None);
            } else {
                let v = val!();
                b.ret(Some(v));
            }
            None
        }
        "unreachable" => {
            b.unreachable();
            None
        }
        other => return Err(format!("unknown instruction `{other}`")),
    };

    if let (Some(name), Some(v)) = (dest, result) {
        locals.insert(name, v);
    }
    Ok(())
}

// ---- dumping ------------------------------------------------------------

struct Dumper<'m> {
    module: &'m Module,
}

impl<'m> Dumper<'m> {
    fn dump(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("module {}\n\n", self.module.name));
        for gid in self.module.globals() {
            let g = self.module.global(gid);
            let Some(cid) = g.initializer else { continue };
            match self.module.constant(cid) {
                ConstantData::CString { bytes, .. } => {
                    let literal = &bytes[..bytes.len().saturating_sub(1)];
                    out.push_str(&format!("global {} = {} constant cstr \"{}\"\n", g.name, linkage_name(g.linkage), escape(literal)));
                }
                ConstantData::Bytes(bytes) => {
                    out.push_str(&format!("global {} = {} constant bytes \"{}\"\n", g.name, linkage_name(g.linkage), escape(bytes)));
                }
                ConstantData::Int { .. } => {}
            }
        }
        out.push('\n');

        for fid in self.module.functions() {
            let func = self.module.function(fid);
            let sig = format!(
                "({})",
                func.params.iter().map(|t| type_name(*t)).collect::<Vec<_>>().join(", ")
            );
            let ret = func.ret_ty.map(|t| format!(" -> {}", type_name(t))).unwrap_or_default();
            if func.is_declaration {
                out.push_str(&format!("extern @{}{}{}\n", func.name, sig, ret));
                continue;
            }
            out.push_str(&format!("func @{}{}{} {{\n", func.name, sig, ret));
            let mut names: HashMap<chakravyuha_ir::Inst, String> = HashMap::new();
            let mut counter = 0usize;
            for (bi, block) in func.blocks().enumerate() {
                let label = if block == func.entry() { "entry".to_owned() } else { format!("bb{bi}") };
                out.push_str(&format!("{label}:\n"));
                for &inst in &func.block(block).insts {
                    if func.opcode(inst).result_type().is_some() {
                        let name = format!("%{counter}");
                        counter += 1;
                        names.insert(inst, name);
                    }
                }
            }
            // Re-walk to emit instruction text now that every result has a name.
            for block in func.blocks() {
                for &inst in &func.block(block).insts {
                    out.push_str("  ");
                    out.push_str(&self.dump_inst(func, inst, &names));
                    out.push('\n');
                }
            }
            out.push_str("}\n\n");
        }
        out
    }

    fn dump_value(&self, v: Value, names: &HashMap<chakravyuha_ir::Inst, String>) -> String {
        match v {
            Value::Inst(i) => names.get(&i).cloned().unwrap_or_else(|| "%?".to_owned()),
            Value::Param(p) => format!("arg{p}"),
            Value::Const(c) => match self.module.constant(c) {
                ConstantData::Int { ty, value } => format!("const {} {}", type_name(*ty), value),
                _ => "const i64 0".to_owned(),
            },
            Value::Global(g) => format!("global {}", self.module.global(g).name),
            Value::Undef => "undef".to_owned(),
        }
    }

    fn block_label(&self, func: &Function, block: Block) -> String {
        if block == func.entry() {
            return "entry".to_owned();
        }
        let idx = func.blocks().position(|b| b == block).unwrap_or(0);
        format!("bb{idx}")
    }

    fn dump_inst(&self, func: &Function, inst: chakravyuha_ir::Inst, names: &HashMap<chakravyuha_ir::Inst, String>) -> String {
        let prefix = names.get(&inst).map(|n| format!("{n} = ")).unwrap_or_default();
        match func.opcode(inst) {
            Opcode::Alloca { ty, count } => format!("{prefix}alloca {} {}", type_name(*ty), count),
            Opcode::Load { ty, ptr } => format!("{prefix}load {}, {}", type_name(*ty), self.dump_value(*ptr, names)),
            Opcode::Store { value, ptr } => {
                format!("store {}, {}", self.dump_value(*value, names), self.dump_value(*ptr, names))
            }
            Opcode::Gep { base, indices } => {
                let idx_str = indices.iter().map(|v| self.dump_value(*v, names)).collect::<Vec<_>>().join(", ");
                format!("{prefix}gep {}, [{}]", self.dump_value(*base, names), idx_str)
            }
            Opcode::Bitcast { value, to } => format!("{prefix}bitcast {} to {}", self.dump_value(*value, names), type_name(*to)),
            Opcode::Call { callee, args, .. } => {
                let callee_str = match callee {
                    Callee::Function(fid) => format!("@{}", self.module.function(*fid).name),
                    Callee::Extern(name) => format!("extern \"{name}\""),
                };
                let args_str = args.iter().map(|v| self.dump_value(*v, names)).collect::<Vec<_>>().join(", ");
                format!("{prefix}call {callee_str}({args_str})")
            }
            Opcode::Phi { ty, incomings } => {
                let parts = incomings
                    .iter()
                    .map(|(v, b)| format!("[{}, {}]", self.dump_value(*v, names), self.block_label(func, *b)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{prefix}phi {} {}", type_name(*ty), parts)
            }
            Opcode::Icmp { pred, lhs, rhs } => {
                format!("{prefix}icmp {} {}, {}", pred_name(*pred), self.dump_value(*lhs, names), self.dump_value(*rhs, names))
            }
            Opcode::Select { ty, cond, if_true, if_false } => format!(
                "{prefix}select {} {}, {}, {}",
                type_name(*ty),
                self.dump_value(*cond, names),
                self.dump_value(*if_true, names),
                self.dump_value(*if_false, names)
            ),
            Opcode::Xor { ty, lhs, rhs } => {
                format!("{prefix}xor {} {}, {}", type_name(*ty), self.dump_value(*lhs, names), self.dump_value(*rhs, names))
            }
            Opcode::Add { ty, lhs, rhs } => {
                format!("{prefix}add {} {}, {}", type_name(*ty), self.dump_value(*lhs, names), self.dump_value(*rhs, names))
            }
            Opcode::Br { target } => format!("br label {}", self.block_label(func, *target)),
            Opcode::CondBr { cond, then_block, else_block } => format!(
                "condbr {}, label {}, label {}",
                self.dump_value(*cond, names),
                self.block_label(func, *then_block),
                self.block_label(func, *else_block)
            ),
            Opcode::Switch { cond, default, cases } => {
                let cases_str = cases
                    .iter()
                    .map(|(n, b)| format!(", {} -> label {}", n, self.block_label(func, *b)))
                    .collect::<String>();
                format!("switch {}, label {}{}", self.dump_value(*cond, names), self.block_label(func, *default), cases_str)
            }
            Opcode::Ret { value } => match value {
                Some(v) => format!("ret {}", self.dump_value(*v, names)),
                None => "ret void".to_owned(),
            },
            Opcode::Unreachable => "unreachable".to_owned(),
            Opcode::UnsupportedTerminator { mnemonic } => format!("; unsupported terminator: {mnemonic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chakravyuha_ir::{ReferenceVerifier, Verifier};

    const BRANCHING: &str = r#"
module classify

extern @print_str(ptr, i32)
global .str.hi = private constant cstr "hi\n"

func @classify(i32) -> i32 {
entry:
  %0 = icmp sgt arg0, const i32 0
  condbr %0, label pos, label neg
pos:
  ret const i32 1
neg:
  ret const i32 -1
}
"#;

    #[test]
    fn parses_and_verifies() {
        let module = parse_module(BRANCHING).unwrap();
        assert_eq!(module.name, "classify");
        assert!(module.find_function("print_str").is_some());
        assert!(module.find_function("classify").is_some());
        assert!(ReferenceVerifier.verify_module(&module).is_ok());
    }

    #[test]
    fn dump_reparse_round_trips_structure() {
        let module = parse_module(BRANCHING).unwrap();
        let dumped = dump_module(&module);
        let reparsed = parse_module(&dumped).expect("dumped text should itself parse");

        assert_eq!(reparsed.name, module.name);
        assert_eq!(reparsed.functions().count(), module.functions().count());
        assert!(ReferenceVerifier.verify_module(&reparsed).is_ok());

        let fid = reparsed.find_function("classify").unwrap();
        let func = reparsed.function(fid);
        assert_eq!(func.blocks().count(), 3);
    }

    #[test]
    fn unknown_instruction_is_a_parse_error() {
        let text = "module m\nfunc @f() {\nentry:\n  bogus\n}\n";
        assert!(parse_module(text).is_err());
    }

    #[test]
    fn dumped_global_string_escapes_round_trip() {
        let module = parse_module(BRANCHING).unwrap();
        let dumped = dump_module(&module);
        assert!(dumped.contains(r#"global .str.hi = private constant cstr "hi\n""#));
    }
}
