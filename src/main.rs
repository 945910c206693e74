use bindplan::{
    diagnostics::{emit_configuration_error, emit_syntax_errors, report_runtime_error},
    language::lower::{BoundLocals, LocalExprCompiler},
    parser::{parse_arguments, parse_signature},
    runtime::{
        environment::{Frame, SlotId},
        value::Value,
        Callable, Interpreter,
    },
};
use std::env;
use std::process;

const USAGE: &str = "Usage: bindplan plan '<params>' | bindplan call '<params>' '<args>'";

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("plan") if args.len() == 3 => show_plan(&args[2]),
        Some("call") if args.len() == 4 => run_call(&args[2], &args[3]),
        _ => {
            eprintln!("{USAGE}");
            process::exit(1);
        }
    }
}

fn define(params: &str) -> Callable {
    let signature = match parse_signature(params) {
        Ok(signature) => signature,
        Err(errors) => {
            emit_syntax_errors("params", params, &errors);
            process::exit(1);
        }
    };
    let kind = signature.kind;
    let defined = signature
        .into_spec()
        .and_then(|spec| Callable::define(&spec, kind));
    match defined {
        Ok(callable) => callable,
        Err(err) => {
            emit_configuration_error("params", params, &err);
            process::exit(1);
        }
    }
}

fn show_plan(params: &str) {
    let callable = define(params);
    let plan = callable.plan();
    let descriptor = callable.descriptor();

    println!("{} accepting {} argument(s)", plan.kind(), plan.arity());
    println!("slots:");
    for index in 0..descriptor.len() {
        let slot = SlotId::new(index);
        let name = descriptor.name_of(slot).unwrap_or("?");
        println!("  {:>4}  {name}", slot.to_string());
    }
    println!("steps:");
    println!("{plan}");
}

fn run_call(params: &str, arguments: &str) {
    let callable = define(params);
    let call = match parse_arguments(arguments) {
        Ok(call) => call,
        Err(errors) => {
            emit_syntax_errors("args", arguments, &errors);
            process::exit(1);
        }
    };

    let compiler = LocalExprCompiler::new();
    let interpreter = Interpreter::new();
    let scope = BoundLocals::new();
    let empty = Frame::with_slots(0);
    let mut values = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        let compiled = match compiler.compile("argument", arg, &scope) {
            Ok(compiled) => compiled,
            Err(err) => {
                emit_configuration_error("args", arguments, &err);
                process::exit(1);
            }
        };
        match interpreter.evaluate(&compiled, &empty) {
            Ok(value) => values.push(value),
            Err(err) => {
                report_runtime_error(&err);
                process::exit(1);
            }
        }
    }

    let block = call.block.map(Value::Proc);
    match callable.invoke(&values, block.as_ref()) {
        Ok(frame) => {
            for (name, value) in callable.bindings(&frame) {
                println!("{name} = {value}");
            }
        }
        Err(err) => {
            report_runtime_error(&err);
            process::exit(1);
        }
    }
}
