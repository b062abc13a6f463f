pub const HELP: &str = r#"
Available commands:

start [file]                   -- start a session stopped at the program entry
target <start> <end> [file]    -- run until execution reaches lines [start, end] of the file
break <file> <line>...         -- replace breakpoints of a file, no lines removes them all
n, next                        -- step over to the next line
s, step                        -- step into a call
out, finish                    -- run until the current function returns
c, continue                    -- continue until the next stop
until <line>                   -- continue until the given line of the program
b, back                        -- go back to the previous location (replays the program)
state                          -- show current location, variables and history size
p, eval <expr>                 -- evaluate an expression in the current frame
stop                           -- end the session
h, help                        -- show this help
q, quit                        -- exit
"#;
