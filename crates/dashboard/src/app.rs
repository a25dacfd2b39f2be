use kobold::prelude::*;

use crate::counter::Counter;
use crate::layout::Region;

// Sidebar on the left, body filling the rest, with the counter in the body.
#[component]
pub fn Page() -> impl View {
    stateful(Counter::new, |counter| {
        bind! { counter:
            let onclick = move |_| counter.increment();
        }

        view! {
            <div class="flex">
                <div class={Region::Sidebar.class()}>
                    { static Region::Sidebar.label() }
                </div>
                <div class={Region::Body.class()}>
                    { static Region::Body.label() }
                    <p>
                        "Count is "{ counter.value() }" "
                        <button {onclick}>"Increment"</button>
                    </p>
                </div>
            </div>
        }
    })
}
