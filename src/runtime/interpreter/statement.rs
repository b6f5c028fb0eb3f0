use super::{Interpreter, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::language::ast::{
    Block, ElseIf, Expr, Identifier, IncrementOp, PrintItem, Statement, BinaryOp,
};
use crate::language::span::Location;
use crate::runtime::callable::Callable;
use crate::runtime::coercion::coerce_for_designator;
use crate::runtime::components::{self, array, assoc_array::RoAssociativeArray};
use crate::runtime::environment::Scope;
use crate::runtime::error::{
    backtrace_array, format_location, BrsError, Operand, RuntimeErrorDetail, RuntimeResult,
    Signal, TypeMismatch,
};
use crate::runtime::numeric;
use crate::runtime::stdlib;
use crate::runtime::value::{Object, Value, ValueKind};
use std::cell::RefCell;
use std::rc::Rc;

const PRINT_ZONE: usize = 16;

impl Interpreter {
    pub(crate) fn execute_statements(&mut self, statements: &[Statement]) -> RuntimeResult<()> {
        for statement in statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    fn execute_block(&mut self, block: &Block) -> RuntimeResult<()> {
        self.execute_statements(&block.statements)
    }

    pub(crate) fn execute(&mut self, statement: &Statement) -> RuntimeResult<()> {
        if !self.env.goto_label.is_empty() {
            return self.search_label(statement);
        }
        if !matches!(statement, Statement::Stop(_)) {
            self.check_suspension(statement)?;
        }
        self.location = statement.location().clone();
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.run_statement(statement))
    }

    fn run_statement(&mut self, statement: &Statement) -> RuntimeResult<()> {
        match statement {
            Statement::Expression(expr) => self.evaluate(expr).map(drop),
            Statement::Assignment { name, value, .. } => {
                self.reject_reserved(name, "Cannot assign a value to reserved name")?;
                let result = self.evaluate(value)?;
                self.assign(name, result, value.location())
            }
            Statement::Dim {
                name, dimensions, ..
            } => self.execute_dim(name, dimensions),
            Statement::Block(block) => self.execute_block(block),
            Statement::ExitFor(location) => Err(Signal::ExitFor(location.clone())),
            Statement::ExitWhile(location) => Err(Signal::ExitWhile(location.clone())),
            Statement::ContinueFor(location) => Err(Signal::ContinueFor(location.clone())),
            Statement::ContinueWhile(location) => Err(Signal::ContinueWhile(location.clone())),
            Statement::Function { name, func } => {
                self.reject_reserved(name, "Cannot create a named function with reserved name")?;
                if self.env.has(&name.name, &[Scope::Module]) {
                    let previous = self.env.defined_location(&name.name);
                    if let Some(previous) = previous.filter(|previous| *previous != func.location) {
                        let error = BrsError::new(
                            format!(
                                "Attempting to declare function '{}' at {}, but it already exists in this scope from {}",
                                name.name, func.location.file, previous.file
                            ),
                            name.location.clone(),
                        );
                        return Err(self.add_error(error));
                    }
                    return Ok(());
                }
                let callable = Callable::user(&name.name, func.clone());
                self.env
                    .define(
                        Scope::Module,
                        &name.name,
                        Value::Callable(Rc::new(callable)),
                        Some(&func.location),
                    )
                    .map_err(|error| self.add_error(error))
            }
            Statement::If {
                condition,
                then_branch,
                else_ifs,
                else_branch,
                ..
            } => self.execute_if(condition, then_branch, else_ifs, else_branch.as_ref()),
            Statement::Increment { target, op, location } => {
                self.execute_increment(target, *op, location)
            }
            Statement::Print { items, .. } => self.execute_print(items),
            Statement::Goto { label, location } => Err(Signal::Goto {
                label: label.name.clone(),
                location: location.clone(),
            }),
            Statement::Label(_) => Ok(()),
            Statement::Return { value, location } => {
                let value = match value {
                    Some(expr) => Some(self.evaluate(expr)?),
                    None => None,
                };
                Err(Signal::Return {
                    value,
                    location: location.clone(),
                })
            }
            Statement::End(location) => Err(Signal::End(location.clone())),
            Statement::Stop(_) => {
                self.debug_mode = true;
                self.check_suspension(statement)
            }
            Statement::For {
                counter,
                start,
                final_value,
                step,
                body,
                ..
            } => self.execute_for(counter, start, final_value, step.as_ref(), body, false),
            Statement::ForEach { item, target, body, .. } => {
                self.execute_for_each(item, target, body, false)
            }
            Statement::While { condition, body, .. } => self.execute_while(condition, body),
            Statement::DottedSet {
                object,
                name,
                value,
                ..
            } => {
                let value = self.evaluate(value)?;
                self.dotted_set(object, name, value)
            }
            Statement::IndexedSet {
                object,
                indexes,
                value,
                closing,
                location,
            } => {
                let value = self.evaluate(value)?;
                self.indexed_set(object, indexes, value, closing, location)
            }
            Statement::Library { path, location } => {
                tracing::debug!(%path, %location, root = ?self.options.root_dir, "library statement ignored at run time");
                Ok(())
            }
            Statement::TryCatch {
                try_block,
                error_binding,
                catch_block,
                ..
            } => self.execute_try(try_block, error_binding, catch_block),
            Statement::Throw { value, location } => {
                let thrown = self.evaluate(value)?;
                Err(self.throw(thrown, location))
            }
        }
    }

    fn reject_reserved(&mut self, name: &Identifier, message: &str) -> RuntimeResult<()> {
        if !name.is_reserved() {
            return Ok(());
        }
        let error = BrsError::new(format!("{} '{}'", message, name.name), name.location.clone());
        Err(self.add_error(error))
    }

    /// Stores `value` in function scope after checking the name's type designator.
    fn assign(&mut self, name: &Identifier, value: Value, value_location: &Location) -> RuntimeResult<()> {
        let value = match name.designator() {
            Some(designator) => {
                let target = ValueKind::from_designator(designator);
                match coerce_for_designator(&value, target) {
                    Some(coerced) => coerced,
                    None => {
                        let error = TypeMismatch::cast(
                            Operand::new(target, &name.location),
                            Operand::new(value.kind(), value_location),
                        )
                        .into_error();
                        return Err(self.add_error(error));
                    }
                }
            }
            None => value,
        };
        self.env
            .define(Scope::Function, &name.name, value, Some(&name.location))
            .map_err(|error| self.add_error(error))
    }

    fn is_true(&mut self, condition: &Expr) -> RuntimeResult<bool> {
        let value = self.evaluate(condition)?.unbox();
        Ok(value.equal_to(&Value::Boolean(true)))
    }

    fn execute_if(
        &mut self,
        condition: &Expr,
        then_branch: &Block,
        else_ifs: &[ElseIf],
        else_branch: Option<&Block>,
    ) -> RuntimeResult<()> {
        if self.is_true(condition)? {
            return self.execute_block(then_branch);
        }
        for else_if in else_ifs {
            if self.is_true(&else_if.condition)? {
                return self.execute_block(&else_if.block);
            }
        }
        match else_branch {
            Some(block) => self.execute_block(block),
            None => Ok(()),
        }
    }

    fn execute_dim(&mut self, name: &Identifier, dimensions: &[Expr]) -> RuntimeResult<()> {
        self.reject_reserved(name, "Cannot assign a value to reserved name")?;
        let mut sizes = Vec::with_capacity(dimensions.len());
        for expr in dimensions {
            let value = self.evaluate(expr)?.unbox();
            let Some(max_index) = value.as_i64() else {
                return Err(
                    self.runtime_error(RuntimeErrorDetail::NonNumericArrayIndex, expr.location())
                );
            };
            // `dim` takes the highest index, not the length
            let size = max_index.saturating_add(1).max(0) as u64;
            let total = sizes.iter().fold(size, |total: u64, size| total.saturating_mul(*size as u64));
            if total > array::MAX_LEN as u64 {
                return Err(self.runtime_error(RuntimeErrorDetail::IndexOutOfBounds, expr.location()));
            }
            sizes.push(size as usize);
        }
        let array = dim_array(&sizes);
        self.env
            .define(Scope::Function, &name.name, array, Some(&name.location))
            .map_err(|error| self.add_error(error))
    }

    fn execute_increment(
        &mut self,
        target: &Expr,
        op: IncrementOp,
        location: &Location,
    ) -> RuntimeResult<()> {
        let current = self.evaluate(target)?.unbox();
        let (operation, binary) = match op {
            IncrementOp::Increment => ("increment", BinaryOp::Add),
            IncrementOp::Decrement => ("decrement", BinaryOp::Subtract),
        };
        let result = match numeric::apply(binary, &current, &Value::Int32(1)) {
            Ok(result) if current.is_number() => result,
            _ => {
                let error = TypeMismatch::new(
                    format!("Attempting to {} value of non-numeric type", operation),
                    Operand::new(current.kind(), location),
                    None,
                )
                .into_error();
                return Err(self.add_error(error));
            }
        };
        match target {
            Expr::Variable(name) => self
                .env
                .define(Scope::Function, &name.name, result, Some(&name.location))
                .map_err(|error| self.add_error(error)),
            Expr::DottedGet { object, name, .. } => self.dotted_set(object, name, result),
            Expr::IndexedGet {
                object,
                indexes,
                closing,
                location,
                ..
            } => self.indexed_set(object, indexes, result, closing, location),
            other => Err(self.runtime_error(RuntimeErrorDetail::BadLHS, other.location())),
        }
    }

    fn execute_print(&mut self, items: &[PrintItem]) -> RuntimeResult<()> {
        self.printed = true;
        // `Tab` and `Pos` exist only while a print statement runs
        for helper in [stdlib::tab(), stdlib::pos()] {
            let name = helper.name.clone();
            self.env
                .define(Scope::Function, &name, Value::Callable(Rc::new(helper)), None)
                .map_err(|error| self.add_error(error))?;
        }
        let column = self.output_column;
        let result = self.print_items(items);
        self.env.remove("Tab", Scope::Function);
        self.env.remove("Pos", Scope::Function);
        if result.is_err() {
            // nothing was written
            self.output_column = column;
        }
        let line = result?;
        self.platform.write_stdout(&line);
        Ok(())
    }

    fn print_items(&mut self, items: &[PrintItem]) -> RuntimeResult<String> {
        let mut line = String::new();
        for item in items {
            let piece = match item {
                PrintItem::Comma => " ".repeat(PRINT_ZONE - self.output_column % PRINT_ZONE),
                PrintItem::Semicolon => continue,
                PrintItem::Expr(expr) => {
                    let value = self.evaluate(expr)?;
                    if value.is_number_comparable() && value.is_positive() {
                        format!(" {}", value)
                    } else {
                        value.to_string()
                    }
                }
            };
            self.advance_column(&piece);
            line.push_str(&piece);
        }
        if !matches!(items.last(), Some(PrintItem::Semicolon)) {
            self.advance_column("\n");
            line.push('\n');
        }
        Ok(line)
    }

    /// Counts from `start` to `final_value`. With `resume` the counter keeps its
    /// current value and is stepped first, as when a `goto` lands in the body.
    fn execute_for(
        &mut self,
        counter: &Identifier,
        start: &Expr,
        final_value: &Expr,
        step: Option<&Expr>,
        body: &Block,
        resume: bool,
    ) -> RuntimeResult<()> {
        let increment = match step {
            Some(expr) => match self.evaluate(expr)?.unbox() {
                Value::Float(value) => Value::Int32(value.trunc() as i32),
                Value::Double(value) => Value::Int32(value.trunc() as i32),
                other => other,
            },
            None => Value::Int32(1),
        };
        let step_location = step.map(Expr::location).unwrap_or(&counter.location);
        if resume {
            self.step_counter(counter, &increment, step_location)?;
        } else {
            let value = self.evaluate(start)?;
            self.assign(counter, value, start.location())?;
        }
        let limit = self.evaluate(final_value)?.unbox();
        // a step of the wrong sign fails the first check and runs the body zero times;
        // a zero step counts as descending
        let ascending = increment.as_f64().is_some_and(|step| step > 0.0);

        loop {
            let current = self.env.get(counter).unwrap_or(Value::Uninitialized).unbox();
            let done = if ascending {
                current.greater_than(&limit)
            } else {
                current.less_than(&limit)
            };
            if done {
                return Ok(());
            }
            match self.execute_block(body) {
                Ok(()) | Err(Signal::ContinueFor(_)) => {}
                Err(Signal::ExitFor(_)) => return Ok(()),
                Err(signal) => return Err(signal),
            }
            self.step_counter(counter, &increment, step_location)?;
        }
    }

    fn step_counter(&mut self, counter: &Identifier, increment: &Value, location: &Location) -> RuntimeResult<()> {
        let current = self.env.get(counter).unwrap_or(Value::Uninitialized).unbox();
        let next = match numeric::apply(BinaryOp::Add, &current, increment) {
            Ok(next) => next,
            Err(_) => {
                let error = TypeMismatch::new(
                    "Operator \"+\" can't be applied to",
                    Operand::new(current.kind(), &counter.location),
                    Some(Operand::new(increment.kind(), location)),
                )
                .into_error();
                return Err(self.add_error(error));
            }
        };
        self.assign(counter, next, location)
    }

    fn execute_for_each(
        &mut self,
        item: &Identifier,
        target: &Expr,
        body: &Block,
        resume: bool,
    ) -> RuntimeResult<()> {
        let collection = self.evaluate(target)?;
        let Some(elements) = components::iterate(&collection) else {
            let message = "BRIGHTSCRIPT: ERROR: Runtime: FOR EACH value is not an enumerable object";
            let at = format_location(&item.location);
            tracing::warn!(location = %at, kind = %collection.kind(), "{}", message);
            self.platform.write_stderr(&format!("{}: {}\n", message, at));
            return Ok(());
        };
        let skip = if resume {
            self.for_each_resume.take().unwrap_or(0)
        } else {
            0
        };
        for (index, element) in elements.into_iter().enumerate() {
            self.env
                .define(Scope::Function, &item.name, element, Some(&item.location))
                .map_err(|error| self.add_error(error))?;
            if index < skip {
                continue;
            }
            match self.execute_block(body) {
                Ok(()) | Err(Signal::ContinueFor(_)) => {}
                Err(Signal::ExitFor(_)) => return Ok(()),
                Err(signal @ Signal::Goto { .. }) => {
                    self.for_each_resume = Some(index + 1);
                    return Err(signal);
                }
                Err(signal) => return Err(signal),
            }
        }
        Ok(())
    }

    fn execute_while(&mut self, condition: &Expr, body: &Block) -> RuntimeResult<()> {
        while self.is_true(condition)? {
            match self.execute_block(body) {
                Ok(()) | Err(Signal::ContinueWhile(_)) => {}
                Err(Signal::ExitWhile(_)) => return Ok(()),
                Err(signal) => return Err(signal),
            }
        }
        Ok(())
    }

    fn dotted_set(&mut self, object: &Expr, name: &Identifier, value: Value) -> RuntimeResult<()> {
        let source = self.evaluate(object)?;
        match source {
            Value::Object(Object::AssocArray(aa)) => {
                aa.borrow_mut().set(&name.name, value, false);
                Ok(())
            }
            Value::Object(Object::Array(_)) => {
                Err(self.runtime_error(RuntimeErrorDetail::NonNumericArrayIndex, &name.location))
            }
            _ => Err(self.runtime_error(RuntimeErrorDetail::BadLHS, &name.location)),
        }
    }

    fn indexed_set(
        &mut self,
        object: &Expr,
        indexes: &[Expr],
        value: Value,
        closing: &Location,
        location: &Location,
    ) -> RuntimeResult<()> {
        let source = self.evaluate(object)?;
        if !source.is_collection() {
            return Err(self.runtime_error(RuntimeErrorDetail::BadLHS, object.location()));
        }
        if let Value::Object(Object::AssocArray(aa)) = &source {
            let key = self.assoc_array_key(indexes, closing)?;
            aa.borrow_mut().set(&key, value, true);
            return Ok(());
        }

        let mut current = source;
        let last = indexes.len().saturating_sub(1);
        for (position, index_expr) in indexes.iter().enumerate() {
            let index = self.array_index(index_expr)?;
            let Value::Object(Object::Array(array)) = &current else {
                return Err(self.runtime_error(RuntimeErrorDetail::BadNumberOfIndexes, location));
            };
            if position < last {
                let next = array.borrow().get(index);
                current = next;
                continue;
            }
            let stored = array.borrow_mut().set(index, value);
            return stored.map_err(|detail| self.runtime_error(detail, closing));
        }
        Ok(())
    }

    fn execute_try(
        &mut self,
        try_block: &Block,
        error_binding: &Identifier,
        catch_block: &Block,
    ) -> RuntimeResult<()> {
        let saved = self.try_mode;
        self.try_mode = true;
        let result = self.execute_block(try_block);
        self.try_mode = saved;
        match result {
            Err(Signal::Error(error)) => {
                let caught = self.error_variable(&error);
                self.env
                    .define(Scope::Function, &error_binding.name, caught, Some(&error_binding.location))
                    .map_err(|error| self.add_error(error))?;
                self.execute_block(catch_block)
            }
            other => other,
        }
    }

    /// The associative array a `catch` variable is bound to.
    fn error_variable(&self, error: &BrsError) -> Value {
        let frames = error.backtrace.as_deref().unwrap_or(&self.stack);
        let backtrace = backtrace_array(&error.location, frames);
        let mut caught = RoAssociativeArray::new(vec![
            ("backtrace".to_string(), backtrace.clone()),
            ("message".to_string(), Value::string(error.message.clone())),
            ("number".to_string(), Value::Int32(error.number())),
            ("rethrown".to_string(), Value::Boolean(false)),
        ]);
        for (key, value) in &error.extra_fields {
            if key == "rethrown" && matches!(value, Value::Boolean(true)) {
                caught.set("rethrow_backtrace", backtrace.clone(), true);
            }
            caught.set(key, value.clone(), true);
        }
        Value::Object(Object::AssocArray(Rc::new(RefCell::new(caught))))
    }

    /// Builds the error a `throw` raises from the thrown value.
    fn throw(&mut self, thrown: Value, location: &Location) -> Signal {
        let malformed = |message: &str| {
            (
                RuntimeErrorDetail::MalformedThrow.errno(),
                message.to_string(),
                Vec::new(),
            )
        };
        let (errno, message, extra_fields) = match thrown.unbox() {
            Value::String(message) => (RuntimeErrorDetail::UserDefined.errno(), message, Vec::new()),
            Value::Object(Object::AssocArray(aa)) => {
                let members: Vec<(String, Value)> = aa
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect();
                let mut errno = RuntimeErrorDetail::UserDefined.errno();
                let mut message = String::new();
                let mut extra_fields = Vec::new();
                let mut failure = None;
                for (key, value) in members {
                    match (key.to_ascii_lowercase().as_str(), value) {
                        ("number", Value::Int32(number)) => {
                            errno = number;
                            if message.is_empty() {
                                message = RuntimeErrorDetail::from_errno(number)
                                    .map(|detail| detail.message())
                                    .unwrap_or_else(|| "UNKNOWN ERROR".to_string());
                            }
                        }
                        ("number" | "message", Value::Invalid) | ("rethrown", _) => {}
                        ("number", _) => failure = Some("Thrown \"number\" is not an integer."),
                        ("message", Value::String(text)) => message = text,
                        ("message", _) => failure = Some("Thrown \"message\" is not a string."),
                        ("backtrace", value @ Value::Object(Object::Array(_))) => {
                            extra_fields.push(("backtrace".to_string(), value));
                            extra_fields.push(("rethrown".to_string(), Value::Boolean(true)));
                        }
                        ("backtrace", _) => failure = Some("Thrown \"backtrace\" is not an object."),
                        (_, value) => extra_fields.push((key, value)),
                    }
                    if failure.is_some() {
                        break;
                    }
                }
                match failure {
                    Some(reason) => malformed(reason),
                    None => (errno, message, extra_fields),
                }
            }
            _ => malformed("Thrown value neither string nor roAssociativeArray."),
        };
        let mut error = BrsError::with_errno(errno, message, location.clone())
            .with_backtrace(self.stack.clone());
        error.extra_fields = extra_fields;
        self.add_error(error)
    }

    /// Skips statements until the pending `goto` label turns up. Labels are found
    /// inside branches, loop bodies and catch blocks; once found, execution goes on
    /// normally from there.
    fn search_label(&mut self, statement: &Statement) -> RuntimeResult<()> {
        match statement {
            Statement::Label(label) => {
                if label.name.eq_ignore_ascii_case(&self.env.goto_label) {
                    self.env.goto_label.clear();
                }
                Ok(())
            }
            Statement::Block(block) => self.execute_block(block),
            Statement::If {
                then_branch,
                else_ifs,
                else_branch,
                ..
            } => {
                self.execute_block(then_branch)?;
                for else_if in else_ifs {
                    if self.env.goto_label.is_empty() {
                        return Ok(());
                    }
                    self.execute_block(&else_if.block)?;
                }
                match else_branch {
                    Some(block) if !self.env.goto_label.is_empty() => self.execute_block(block),
                    _ => Ok(()),
                }
            }
            Statement::TryCatch { catch_block, .. } => self.execute_block(catch_block),
            Statement::For {
                counter,
                start,
                final_value,
                step,
                body,
                ..
            } => match self.execute_block(body) {
                Ok(()) if !self.env.goto_label.is_empty() => Ok(()),
                Ok(()) | Err(Signal::ContinueFor(_)) => {
                    self.execute_for(counter, start, final_value, step.as_ref(), body, true)
                }
                Err(Signal::ExitFor(_)) => Ok(()),
                Err(signal) => Err(signal),
            },
            Statement::ForEach {
                item, target, body, ..
            } => match self.execute_block(body) {
                Ok(()) if !self.env.goto_label.is_empty() => Ok(()),
                Ok(()) | Err(Signal::ContinueFor(_)) => {
                    self.execute_for_each(item, target, body, true)
                }
                Err(Signal::ExitFor(_)) => Ok(()),
                Err(signal) => Err(signal),
            },
            Statement::While { condition, body, .. } => match self.execute_block(body) {
                Ok(()) if !self.env.goto_label.is_empty() => Ok(()),
                Ok(()) | Err(Signal::ContinueWhile(_)) => self.execute_while(condition, body),
                Err(Signal::ExitWhile(_)) => Ok(()),
                Err(signal) => Err(signal),
            },
            _ => Ok(()),
        }
    }
}

/// Nested arrays for `dim`; the innermost level holds empty arrays.
fn dim_array(sizes: &[usize]) -> Value {
    match sizes.split_first() {
        Some((size, rest)) => Value::new_array((0..*size).map(|_| dim_array(rest)).collect()),
        None => Value::new_array(Vec::new()),
    }
}
