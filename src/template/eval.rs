//! tree-walking interpreter for parsed expression bodies

use std::fmt;

use serde_json::Value as Json;

use super::error::ScriptError;
use super::markup::{HtmlMarkup, MarkupBuilder};
use super::types::{BinaryOp, Expr, Literal, LogicalOp, Program, Stmt, UnaryOp};
use super::value::{self, Value};
use crate::hass::Hass;

/// everything an expression can see besides the entity state
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    hass: &'a Hass,
    user: Option<&'a Json>,
    markup: &'a dyn MarkupBuilder,
}

impl<'a> EvalContext<'a> {
    /// context over a snapshot; the user identity is taken from `hass.user`
    pub fn new(hass: &'a Hass) -> Self {
        Self {
            hass,
            user: hass.user.as_ref(),
            markup: &HtmlMarkup,
        }
    }

    /// override the user identity
    pub fn with_user(mut self, user: &'a Json) -> Self {
        self.user = Some(user);
        self
    }

    /// use a host-provided markup builder for the `html` tag
    pub fn with_markup(mut self, markup: &'a dyn MarkupBuilder) -> Self {
        self.markup = markup;
        self
    }

    pub fn hass(&self) -> &'a Hass {
        self.hass
    }

    pub fn user(&self) -> Option<&'a Json> {
        self.user
    }
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("states", &self.hass.states.len())
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// run a program with the four bindings
pub(crate) fn run<'a>(
    program: &Program,
    state: Value<'a>,
    ctx: &EvalContext<'a>,
) -> Result<Value<'a>, ScriptError> {
    let bindings = vec![
        ("hass".to_string(), Value::Hass(ctx.hass)),
        ("state".to_string(), state),
        (
            "user".to_string(),
            ctx.user.map(Value::from_json).unwrap_or_default(),
        ),
        ("html".to_string(), Value::MarkupHelper),
    ];

    let mut interpreter = Interpreter {
        scopes: vec![bindings],
        markup: ctx.markup,
    };

    for stmt in &program.body {
        if let Flow::Return(value) = interpreter.exec(stmt)? {
            return Ok(value);
        }
    }

    Ok(Value::Undefined)
}

enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

/// why expression evaluation stopped early
enum Fault {
    Thrown(ScriptError),
    /// `?.` met null or undefined; the enclosing chain evaluates to undefined
    ShortCircuit,
}

impl From<ScriptError> for Fault {
    fn from(err: ScriptError) -> Self {
        Fault::Thrown(err)
    }
}

type Scope<'a> = Vec<(String, Value<'a>)>;

struct Interpreter<'a> {
    scopes: Vec<Scope<'a>>,
    markup: &'a dyn MarkupBuilder,
}

impl<'a> Interpreter<'a> {
    fn lookup(&self, name: &str) -> Option<&Value<'a>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }

    fn declare(&mut self, name: &str, value: Value<'a>) -> Result<(), ScriptError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| ScriptError::syntax("declaration outside of any scope"))?;

        if scope.iter().any(|(n, _)| n == name) {
            return Err(ScriptError::syntax(format!(
                "Identifier '{}' has already been declared",
                name
            )));
        }
        scope.push((name.to_string(), value));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------------

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow<'a>, ScriptError> {
        match stmt {
            Stmt::Return(None) => Ok(Flow::Return(Value::Undefined)),
            Stmt::Return(Some(expr)) => Ok(Flow::Return(self.eval(expr)?)),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Declare { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                self.declare(name, value)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.exec(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(body) => {
                self.scopes.push(Vec::new());
                let mut flow = Ok(Flow::Normal);
                for stmt in body {
                    flow = self.exec(stmt);
                    if !matches!(flow, Ok(Flow::Normal)) {
                        break;
                    }
                }
                self.scopes.pop();
                flow
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    // ------------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Value<'a>, ScriptError> {
        match self.eval_expr(expr) {
            Ok(value) => Ok(value),
            Err(Fault::ShortCircuit) => Ok(Value::Undefined),
            Err(Fault::Thrown(err)) => Err(err),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value<'a>, Fault> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Undefined => Value::Undefined,
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expr::Ident(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| ScriptError::reference(format!("{} is not defined", name)).into()),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            Expr::Template { quasis, exprs } => {
                let values = self.eval_all(exprs)?;
                let mut out = String::new();
                for (i, chunk) in quasis.iter().enumerate() {
                    out.push_str(chunk);
                    if let Some(value) = values.get(i) {
                        out.push_str(&value.to_string());
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Tagged { tag, quasis, exprs } => {
                let tag_value = self.eval_expr(tag)?;
                if tag_value != Value::MarkupHelper {
                    return Err(not_a_function(tag).into());
                }
                let values = self.eval_all(exprs)?;
                Ok(Value::Markup(self.markup.build(quasis, &values)))
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval_expr(object)?;
                if *optional && object.is_nullish() {
                    return Err(Fault::ShortCircuit);
                }
                let key = self.eval_expr(property)?;
                Ok(object.get_member(&key)?)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional),
            Expr::OptionalChain(inner) => match self.eval_expr(inner) {
                Err(Fault::ShortCircuit) => Ok(Value::Undefined),
                other => other,
            },
            Expr::Unary { op, operand } => self.eval_unary(*op, operand),
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval_expr(left)?;
                let take_left = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if take_left {
                    Ok(left)
                } else {
                    self.eval_expr(right)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value<'a>>, Fault> {
        exprs.iter().map(|expr| self.eval(expr).map_err(Fault::from)).collect()
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        optional: bool,
    ) -> Result<Value<'a>, Fault> {
        // only methods of built-in values are callable
        let Expr::Member {
            object,
            property,
            optional: optional_member,
        } = callee
        else {
            let callee_value = self.eval_expr(callee)?;
            if optional && callee_value.is_nullish() {
                return Err(Fault::ShortCircuit);
            }
            return Err(match callee_value {
                Value::MarkupHelper => {
                    ScriptError::type_error("html can only be used as a template tag")
                }
                _ => not_a_function(callee),
            }
            .into());
        };

        let target = self.eval_expr(object)?;
        if *optional_member && target.is_nullish() {
            return Err(Fault::ShortCircuit);
        }
        let key = self.eval_expr(property)?;
        let name = key.to_string();

        if target.is_nullish() {
            // reading a method of null or undefined throws
            target.get_member(&key)?;
        }

        let args = self.eval_all(args)?;
        match target.call_method(&name, &args) {
            Some(result) => Ok(result?),
            None if optional => Err(Fault::ShortCircuit),
            None => Err(not_a_function(callee).into()),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value<'a>, Fault> {
        // typeof tolerates undeclared names
        if let (UnaryOp::TypeOf, Expr::Ident(name)) = (op, operand) {
            let type_name = self.lookup(name).map(Value::type_of).unwrap_or("undefined");
            return Ok(Value::String(type_name.to_string()));
        }

        let value = self.eval_expr(operand)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::String(value.type_of().to_string()),
        })
    }
}

fn binary<'a>(op: BinaryOp, left: &Value<'a>, right: &Value<'a>) -> Value<'a> {
    use std::cmp::Ordering::{Equal, Greater, Less};

    let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let ordering = || value::compare(left, right);

    match op {
        BinaryOp::Add => value::add(left, right),
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Rem => number(|a, b| a % b),
        BinaryOp::Eq => Value::Bool(value::loose_eq(left, right)),
        BinaryOp::Ne => Value::Bool(!value::loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(value::strict_eq(left, right)),
        BinaryOp::StrictNe => Value::Bool(!value::strict_eq(left, right)),
        BinaryOp::Lt => Value::Bool(ordering() == Some(Less)),
        BinaryOp::Le => Value::Bool(matches!(ordering(), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(ordering() == Some(Greater)),
        BinaryOp::Ge => Value::Bool(matches!(ordering(), Some(Greater | Equal))),
    }
}

/// `<callee> is not a function`, naming the callee the way it was written
fn not_a_function(callee: &Expr) -> ScriptError {
    ScriptError::type_error(format!("{} is not a function", describe(callee)))
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => match property.as_ref() {
            Expr::Literal(Literal::String(name)) => format!("{}.{}", describe(object), name),
            _ => format!("{}[...]", describe(object)),
        },
        Expr::OptionalChain(inner) => describe(inner),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}
